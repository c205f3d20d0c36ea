use hyper::{Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

use crate::proxy::context::RequestContext;
use crate::proxy::core::ProxyCore;
use crate::proxy::synthetic_response::too_many_requests_response;
use crate::proxy::ProxyBody;
use crate::security::{ClientIdentity, LimiterRegistry};

/// Per-client admission in front of [`ProxyCore`].
///
/// Rejected requests never reach the upstream and never fire the
/// request/response hooks.
pub struct Admission {
    registry: Arc<LimiterRegistry>,
    core: ProxyCore,
}

impl Admission {
    pub fn new(registry: Arc<LimiterRegistry>, core: ProxyCore) -> Self {
        Self { registry, core }
    }

    /// Check rate limiting for an incoming request.
    ///
    /// Returns:
    /// - `None` if request is allowed to proceed
    /// - `Some(429 response)` if the client's bucket is empty
    pub fn check(&self, context: &RequestContext) -> Option<Response<ProxyBody>> {
        if self.registry.check(&context.client) {
            debug!(client_ip = %context.client, "Rate limit check passed");
            return None;
        }

        self.core.observer().on_rate_limited(context);
        Some(too_many_requests_response())
    }

    /// Admit or reject `req` from `peer`, forwarding admitted requests.
    pub async fn handle(&self, req: Request<ProxyBody>, peer: SocketAddr) -> Response<ProxyBody> {
        let context = RequestContext::from_request(&req, ClientIdentity::from(peer));
        if let Some(rejection) = self.check(&context) {
            return rejection;
        }
        self.core.serve(req, context).await
    }

    pub fn registry(&self) -> &Arc<LimiterRegistry> {
        &self.registry
    }

    pub fn core(&self) -> &ProxyCore {
        &self.core
    }
}
