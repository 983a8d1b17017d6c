//! HTTP routes for the inspection gateway

pub mod health;
pub mod inspection;

pub use health::health_check;
pub use inspection::{
    handle_add_item, handle_delete_item, handle_get_document, handle_sync_document,
    handle_update_status, ItemRoute,
};

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

/// Serialize `body` as a JSON response with permissive CORS
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => with_json_headers(status, Bytes::from(json)),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            with_json_headers(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"success":false,"error":"Internal serialization error"}"#),
            )
        }
    }
}

/// `{"success": false, "error": message}`
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &serde_json::json!({
            "success": false,
            "error": message
        }),
    )
}

fn with_json_headers(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
