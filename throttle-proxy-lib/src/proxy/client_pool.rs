use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use crate::config::TimeoutConfig;
use crate::proxy::ProxyBody;

/// Pooled HTTP/1.1 client used for every upstream request
pub type HttpClient = Client<HttpConnector, ProxyBody>;

/// Build the upstream client.
///
/// One client is shared by all requests so connections to the upstream are
/// reused instead of opened per request.
pub fn build_client(timeout: &TimeoutConfig) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(Duration::from_millis(timeout.connect_ms)));
    connector.set_nodelay(true);
    if timeout.keep_alive.enabled {
        connector.set_keepalive(Some(Duration::from_secs(timeout.keep_alive.timeout_secs)));
    } else {
        connector.set_keepalive(None);
    }

    let mut builder = Client::builder(TokioExecutor::new());
    builder.pool_idle_timeout(Duration::from_secs(timeout.pool_idle_secs));
    if !timeout.keep_alive.enabled {
        builder.pool_max_idle_per_host(0);
    }
    builder.build(connector)
}
