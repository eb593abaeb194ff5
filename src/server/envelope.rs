use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::AgentError;

/// This service owns caching, so intermediaries must not cache its answers.
const NO_STORE_HEADERS: [(header::HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

#[derive(Serialize)]
struct Success<T> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
struct Failure {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

pub fn success<T: Serialize>(data: T) -> Response {
    with_no_store(
        StatusCode::OK,
        Json(Success { success: true, data }).into_response(),
    )
}

/// `upstream_status` is echoed for pass-through failures only.
pub fn failure(
    status: StatusCode,
    error: impl Into<String>,
    upstream_status: Option<u16>,
    details: Option<String>,
) -> Response {
    let body = Failure {
        success: false,
        error: error.into(),
        status: upstream_status,
        details,
    };
    with_no_store(status, Json(body).into_response())
}

fn with_no_store(status: StatusCode, mut response: Response) -> Response {
    *response.status_mut() = status;
    let headers = response.headers_mut();
    for (name, value) in NO_STORE_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    response
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), "request failed: {}", self);
        } else {
            warn!(status = status.as_u16(), "request rejected: {}", self);
        }
        failure(status, self.public_message(), None, self.diagnostic())
    }
}
