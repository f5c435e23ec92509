//! Event-stream route

use std::convert::Infallible;
use std::sync::Arc;

use futures_util::StreamExt;
use log::debug;
use warp::http::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use warp::hyper::Body;
use warp::reply::Response;

use crate::core::ServerManager;
use crate::handlers::response::failure;

// GET /api/sse/{code}
pub async fn open_stream(code: String, manager: Arc<ServerManager>) -> Result<Response, Infallible> {
    let stream = match manager.open_stream(&code).await {
        Ok(stream) => stream,
        Err(e) => {
            debug!("Refused stream for room {}: {}", code, e);
            return Ok(failure(&e));
        }
    };

    let mut response = Response::new(Body::wrap_stream(stream.map(Ok::<_, Infallible>)));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}
