use hyper::{Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::proxy::admission::Admission;
use crate::proxy::core::ProxyCore;
use crate::proxy::observer::ProxyObserver;
use crate::proxy::upstream::UpstreamTarget;
use crate::proxy::ProxyBody;
use crate::security::LimiterRegistry;

/// A rate-limited reverse proxy for one upstream.
///
/// Owns its limiter registry, so two instances never share client state.
pub struct ReverseProxy {
    admission: Admission,
}

impl ReverseProxy {
    /// Build from a validated configuration.
    ///
    /// # Errors
    /// Fails when the upstream or the rate limit policy is invalid.
    pub fn new(config: &Config, observer: Arc<dyn ProxyObserver>) -> Result<Self> {
        let registry = Arc::new(LimiterRegistry::from_config(&config.rate_limit)?);
        let core = ProxyCore::from_config(config, observer)?;
        Ok(Self::from_parts(registry, core))
    }

    pub fn from_parts(registry: Arc<LimiterRegistry>, core: ProxyCore) -> Self {
        Self { admission: Admission::new(registry, core) }
    }

    /// Handle one inbound request from `peer`
    pub async fn handle(&self, req: Request<ProxyBody>, peer: SocketAddr) -> Response<ProxyBody> {
        self.admission.handle(req, peer).await
    }

    pub fn registry(&self) -> &Arc<LimiterRegistry> {
        self.admission.registry()
    }

    pub fn upstream(&self) -> &UpstreamTarget {
        self.admission.core().target()
    }
}
