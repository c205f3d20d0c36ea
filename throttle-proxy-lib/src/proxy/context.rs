use chrono::{DateTime, Utc};
use http::{HeaderMap, Method, Request, StatusCode, Uri};
use std::time::Duration;

use crate::proxy::http_result::HttpError;
use crate::security::ClientIdentity;

/// Per-request facts captured on arrival, before any rewriting.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Request target as received from the client
    pub url: String,
    pub client: ClientIdentity,
    /// Empty when the client sent no `User-Agent`
    pub user_agent: String,
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn from_request<B>(req: &Request<B>, client: ClientIdentity) -> Self {
        let user_agent = req
            .headers()
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Self {
            method: req.method().clone(),
            url: req.uri().to_string(),
            client,
            user_agent,
            received_at: Utc::now(),
        }
    }
}

/// Fired once the request has been rewritten for the upstream
#[derive(Debug)]
pub struct RequestEvent<'a> {
    pub context: &'a RequestContext,
    /// Absolute upstream URI
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    pub timestamp: DateTime<Utc>,
}

/// Fired when the upstream answered, before the response is relayed
#[derive(Debug)]
pub struct ResponseEvent<'a> {
    pub context: &'a RequestContext,
    pub status: StatusCode,
    pub headers: &'a HeaderMap,
    /// Time spent waiting for the upstream response head
    pub elapsed: Duration,
    pub timestamp: DateTime<Utc>,
}

/// Fired when a request could not be completed against the upstream
#[derive(Debug)]
pub struct ErrorEvent<'a> {
    pub context: &'a RequestContext,
    pub error: &'a HttpError,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_request_facts() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/submit?x=1")
            .header("user-agent", "curl/8.0")
            .body(())
            .unwrap_or_else(|e| panic!("{e}"));
        let ctx =
            RequestContext::from_request(&req, ClientIdentity::from_remote_addr("10.1.1.1:5000"));

        assert_eq!(ctx.method, Method::POST);
        assert_eq!(ctx.url, "/submit?x=1");
        assert_eq!(ctx.client.as_str(), "10.1.1.1");
        assert_eq!(ctx.user_agent, "curl/8.0");
    }

    #[test]
    fn missing_user_agent_is_empty() {
        let req = Request::builder()
            .uri("/")
            .body(())
            .unwrap_or_else(|e| panic!("{e}"));
        let ctx =
            RequestContext::from_request(&req, ClientIdentity::from_remote_addr("10.1.1.1:5000"));
        assert!(ctx.user_agent.is_empty());
    }
}
