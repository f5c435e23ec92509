use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use roomcast::config::ServerConfig;
use roomcast::core::ServerManager;
use roomcast::handlers::routes;

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    // Load config from env
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let manager = Arc::new(ServerManager::new(config));
    let config = manager.config();
    info!(
        "Configuration: ping_interval={:?}, max_connections_per_room={:?}, room_ttl={}h, rate_limit_per_minute={:?}",
        config.ping_interval,
        config.max_connections_per_room,
        config.room_ttl.num_hours(),
        config.rate_limit_per_minute
    );
    if config.admin_token.is_none() {
        warn!("ROOMCAST_ADMIN_TOKEN is not set, admin routes will refuse every request");
    }
    manager.clone().start_cleanup_task();

    let shutdown_manager = manager.clone();
    let (bound, server) = match warp::serve(routes(manager)).try_bind_with_graceful_shutdown(
        addr,
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
            shutdown_manager.shutdown();
        },
    ) {
        Ok(bound) => bound,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Starting Roomcast server on {}", bound);
    server.await;
    info!("Server stopped");
}
