//! Request handlers for the HTTP endpoints

pub mod admin;
pub mod response;
pub mod rooms;
pub mod stream;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use warp::{Filter, Rejection, Reply};

use crate::constants::{
    ADMIN_PATH, API_PATH, CLEANUP_PATH, MESSAGES_PATH, ROOMS_PATH, SSE_PATH, STATS_PATH,
};
use crate::core::ServerManager;

/// Largest accepted JSON body on write routes
const MAX_BODY_BYTES: u64 = 64 * 1024;

/// All routes of the server
pub fn routes(
    manager: Arc<ServerManager>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| "OK");

    let create_room = warp::path(API_PATH)
        .and(warp::path(ROOMS_PATH))
        .and(warp::path::end())
        .and(warp::post())
        .and(client_ip())
        .and(with_manager(manager.clone()))
        .and_then(rooms::create_room);

    let get_room = warp::path(API_PATH)
        .and(warp::path(ROOMS_PATH))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_manager(manager.clone()))
        .and_then(rooms::get_room);

    let list_messages = warp::path(API_PATH)
        .and(warp::path(ROOMS_PATH))
        .and(warp::path::param::<String>())
        .and(warp::path(MESSAGES_PATH))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<rooms::MessageQuery>())
        .and(with_manager(manager.clone()))
        .and_then(rooms::list_messages);

    let post_message = warp::path(API_PATH)
        .and(warp::path(ROOMS_PATH))
        .and(warp::path::param::<String>())
        .and(warp::path(MESSAGES_PATH))
        .and(warp::path::end())
        .and(warp::post())
        .and(client_ip())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<rooms::NewMessage>())
        .and(with_manager(manager.clone()))
        .and_then(rooms::post_message);

    let event_stream = warp::path(API_PATH)
        .and(warp::path(SSE_PATH))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_manager(manager.clone()))
        .and_then(stream::open_stream);

    let cleanup = warp::path(API_PATH)
        .and(warp::path(CLEANUP_PATH))
        .and(warp::path::end())
        .and(warp::post())
        .and(authorization())
        .and(with_manager(manager.clone()))
        .and_then(admin::cleanup);

    health
        .or(create_room)
        .or(get_room)
        .or(list_messages)
        .or(post_message)
        .or(event_stream)
        .or(cleanup)
        .or(admin_routes(manager))
}

/// Routes under /api/admin
fn admin_routes(
    manager: Arc<ServerManager>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let admin = warp::path(API_PATH).and(warp::path(ADMIN_PATH));

    let stats = admin
        .and(warp::path(STATS_PATH))
        .and(warp::path::end())
        .and(warp::get())
        .and(authorization())
        .and(with_manager(manager.clone()))
        .and_then(admin::stats);

    let list_rooms = admin
        .and(warp::path(ROOMS_PATH))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<admin::RoomsQuery>())
        .and(authorization())
        .and(with_manager(manager.clone()))
        .and_then(admin::list_rooms);

    let get_room = admin
        .and(warp::path(ROOMS_PATH))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(authorization())
        .and(with_manager(manager.clone()))
        .and_then(admin::get_room);

    let delete_room = admin
        .and(warp::path(ROOMS_PATH))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(authorization())
        .and(with_manager(manager.clone()))
        .and_then(admin::delete_room);

    let cleanup = admin
        .and(warp::path(CLEANUP_PATH))
        .and(warp::path::end())
        .and(warp::post())
        .and(authorization())
        .and(with_manager(manager))
        .and_then(admin::admin_cleanup);

    stats.or(list_rooms).or(get_room).or(delete_room).or(cleanup)
}

fn authorization() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
}

// Helper function to include the server manager in request
fn with_manager(
    manager: Arc<ServerManager>,
) -> impl Filter<Extract = (Arc<ServerManager>,), Error = Infallible> + Clone {
    warp::any().map(move || manager.clone())
}

/// Client identifier for rate limiting: first `x-forwarded-for` hop, then
/// `x-real-ip`, then the socket address
fn client_ip() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::optional::<String>("x-forwarded-for")
        .and(warp::header::optional::<String>("x-real-ip"))
        .and(warp::addr::remote())
        .map(
            |forwarded: Option<String>, real_ip: Option<String>, remote: Option<SocketAddr>| {
                resolve_client_ip(forwarded.as_deref(), real_ip.as_deref(), remote)
            },
        )
}

fn resolve_client_ip(
    forwarded: Option<&str>,
    real_ip: Option<&str>,
    remote: Option<SocketAddr>,
) -> String {
    forwarded
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| real_ip.map(str::trim).filter(|ip| !ip.is_empty()))
        .map(str::to_string)
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
