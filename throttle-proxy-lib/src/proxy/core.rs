use chrono::Utc;
use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::Result;
use crate::proxy::client_pool::{build_client, HttpClient};
use crate::proxy::context::{ErrorEvent, RequestContext, RequestEvent, ResponseEvent};
use crate::proxy::forwarding::{rewrite_request, RewriteOptions};
use crate::proxy::headers::remove_hop_by_hop_headers;
use crate::proxy::http_result::HttpError;
use crate::proxy::observer::ProxyObserver;
use crate::proxy::synthetic_response::synthetic_error_response;
use crate::proxy::upstream::UpstreamTarget;
use crate::proxy::ProxyBody;

/// Forwards admitted requests to the single upstream and relays the answer.
///
/// Every failure is answered with an empty-bodied error status; `serve` never
/// returns an error to the connection layer.
pub struct ProxyCore {
    target: UpstreamTarget,
    client: HttpClient,
    observer: Arc<dyn ProxyObserver>,
    options: RewriteOptions,
}

impl ProxyCore {
    pub fn new(
        target: UpstreamTarget,
        client: HttpClient,
        observer: Arc<dyn ProxyObserver>,
        options: RewriteOptions,
    ) -> Self {
        Self { target, client, observer, options }
    }

    pub fn from_config(config: &Config, observer: Arc<dyn ProxyObserver>) -> Result<Self> {
        let target = UpstreamTarget::from_config(&config.upstream)?;
        let options =
            RewriteOptions { preserve_host: config.preserve_host, is_https: config.tls.is_some() };
        Ok(Self::new(target, build_client(&config.timeout), observer, options))
    }

    pub fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    pub fn observer(&self) -> &Arc<dyn ProxyObserver> {
        &self.observer
    }

    /// Forward `req` and produce the response for the client.
    pub async fn serve(&self, req: Request<ProxyBody>, context: RequestContext) -> Response<ProxyBody> {
        let out_req = match rewrite_request(req, &self.target, &context.client, self.options) {
            Ok(r) => r,
            Err(e) => return self.fail(&context, e),
        };

        self.observer.on_request(&RequestEvent {
            context: &context,
            uri: out_req.uri(),
            headers: out_req.headers(),
            timestamp: Utc::now(),
        });

        let start = Instant::now();
        let mut resp = match self.client.request(out_req).await {
            Ok(resp) => resp,
            Err(e) => {
                return self.fail(&context, HttpError::FailedToGetResponseFromBackend(error_chain(&e)))
            }
        };

        let hook = self.observer.on_response(&ResponseEvent {
            context: &context,
            status: resp.status(),
            headers: resp.headers(),
            elapsed: start.elapsed(),
            timestamp: Utc::now(),
        });
        if let Err(e) = hook {
            return self.fail(&context, HttpError::ResponseHookFailed(e.to_string()));
        }

        remove_hop_by_hop_headers(resp.headers_mut());
        resp.map(|b| b.boxed())
    }

    fn fail(&self, context: &RequestContext, error: HttpError) -> Response<ProxyBody> {
        self.observer.on_error(&ErrorEvent { context, error: &error, timestamp: Utc::now() });
        synthetic_error_response(StatusCode::from(&error))
    }
}

/// `Display` of `err` followed by every source, colon separated
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Layer(&'static str, Option<Box<Layer>>);

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Layer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_deref().map(|l| l as &(dyn std::error::Error + 'static))
        }
    }

    #[test]
    fn error_chain_joins_sources() {
        let err = Layer(
            "client error (Connect)",
            Some(Box::new(Layer("tcp connect error", Some(Box::new(Layer("Connection refused", None)))))),
        );
        assert_eq!(
            error_chain(&err),
            "client error (Connect): tcp connect error: Connection refused"
        );
    }
}
