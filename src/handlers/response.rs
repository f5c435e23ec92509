//! JSON envelope shared by every API route

use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::error::RoomcastError;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

/// Successful reply with the given status
pub fn success<T: Serialize>(data: T, status: StatusCode) -> Response {
    let body = ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    };
    reply::with_status(reply::json(&body), status).into_response()
}

/// Error reply; internal failures are logged and their details withheld
pub fn failure(err: &RoomcastError) -> Response {
    let status = err.status();
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("Request failed: {}", err);
        "Internal server error".to_string()
    } else {
        err.to_string()
    };

    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(ApiError {
            code: err.code(),
            message,
        }),
    };
    reply::with_status(reply::json(&body), status).into_response()
}
