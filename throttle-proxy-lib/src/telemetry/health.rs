use hyper::Response;
use hyper::StatusCode;
use serde_json::json;

use crate::error::{ProxyError, Result};
use crate::proxy::{full_body, ProxyBody};

/// Health check response - always returns 200 if process is running
pub fn health_check_response() -> Result<Response<ProxyBody>> {
    let body = json!({"status": "healthy"});
    let body_bytes = serde_json::to_vec(&body)
        .map_err(|e| ProxyError::Http(format!("Failed to serialize health response: {e}")))?;

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(full_body(body_bytes))
        .map_err(|e| ProxyError::Http(format!("Failed to build health response: {e}")))
}
