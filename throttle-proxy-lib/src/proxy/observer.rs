use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::proxy::context::{ErrorEvent, RequestContext, RequestEvent, ResponseEvent};
use crate::telemetry::Metrics;

/// Returned by [`ProxyObserver::on_response`] to fail the request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Lifecycle hooks around each proxied request.
///
/// Exactly one of `on_rate_limited`, `on_error` or the
/// `on_request`/`on_response` pair runs to completion for every request.
/// `on_request` may still be followed by `on_error` when the upstream fails.
/// Hooks run inline on the request path and must not block.
pub trait ProxyObserver: Send + Sync {
    /// The rewritten request is about to be sent upstream
    fn on_request(&self, event: &RequestEvent<'_>);

    /// The upstream answered. An `Err` turns the exchange into a gateway error.
    fn on_response(&self, event: &ResponseEvent<'_>) -> Result<(), HookError>;

    fn on_error(&self, event: &ErrorEvent<'_>);

    /// The client ran out of tokens; nothing was sent upstream
    fn on_rate_limited(&self, context: &RequestContext);
}

/// Structured log records for every lifecycle event, plus optional metrics.
#[derive(Clone, Default)]
pub struct TracingObserver {
    metrics: Option<Arc<Metrics>>,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        Self { metrics: Some(metrics) }
    }
}

impl ProxyObserver for TracingObserver {
    fn on_request(&self, event: &RequestEvent<'_>) {
        let ctx = event.context;
        info!(
            method = %ctx.method,
            url = %event.uri,
            client_ip = %ctx.client,
            user_agent = %ctx.user_agent,
            timestamp = %event.timestamp.to_rfc3339(),
            "Received incoming request"
        );
        if let Some(m) = &self.metrics {
            m.record_forwarded(ctx.method.as_str());
        }
    }

    fn on_response(&self, event: &ResponseEvent<'_>) -> Result<(), HookError> {
        let ctx = event.context;
        info!(
            status = event.status.as_u16(),
            method = %ctx.method,
            url = %ctx.url,
            client_ip = %ctx.client,
            user_agent = %ctx.user_agent,
            elapsed_ms = event.elapsed.as_millis() as u64,
            timestamp = %event.timestamp.to_rfc3339(),
            "Outgoing response"
        );
        if let Some(m) = &self.metrics {
            m.record_upstream_response(ctx.method.as_str(), event.status.as_u16(), event.elapsed);
        }
        Ok(())
    }

    fn on_error(&self, event: &ErrorEvent<'_>) {
        let ctx = event.context;
        error!(
            error = %event.error,
            error_type = event.error.error_type(),
            method = %ctx.method,
            url = %ctx.url,
            client_ip = %ctx.client,
            user_agent = %ctx.user_agent,
            timestamp = %event.timestamp.to_rfc3339(),
            "Error encountered while processing request"
        );
        if let Some(m) = &self.metrics {
            m.record_upstream_error(event.error.error_type());
        }
    }

    fn on_rate_limited(&self, context: &RequestContext) {
        warn!(
            client_ip = %context.client,
            method = %context.method,
            url = %context.url,
            user_agent = %context.user_agent,
            timestamp = %context.received_at.to_rfc3339(),
            "Rate limit exceeded"
        );
        if let Some(m) = &self.metrics {
            m.record_rate_limit_rejection();
        }
    }
}
