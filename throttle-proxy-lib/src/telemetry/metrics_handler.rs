use hyper::Response;
use hyper::StatusCode;
use prometheus::{Encoder, TextEncoder};

use crate::error::{ProxyError, Result};
use crate::proxy::{full_body, ProxyBody};

/// Render every metric family in `registry` in the Prometheus text format
pub fn handle_metrics(registry: &prometheus::Registry) -> Result<Response<ProxyBody>> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ProxyError::Http(format!("Failed to encode metrics: {e}")))?;

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", encoder.format_type())
        .body(full_body(buffer))
        .map_err(|e| ProxyError::Http(format!("Failed to build response: {e}")))
}
