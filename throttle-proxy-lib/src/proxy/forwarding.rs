use http::header::HOST;
use http::uri::PathAndQuery;
use http::{HeaderValue, Request, Uri, Version};

use crate::proxy::headers::{add_forwarded_headers, remove_hop_by_hop_headers};
use crate::proxy::http_result::HttpError;
use crate::proxy::upstream::UpstreamTarget;
use crate::security::ClientIdentity;

/// Knobs for [`rewrite_request`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Keep the client's `Host` instead of the upstream authority
    pub preserve_host: bool,
    /// The inbound connection was TLS (drives `X-Forwarded-Proto`)
    pub is_https: bool,
}

/// Point an inbound request at `target`.
///
/// Scheme and authority are replaced, path and query are kept byte for byte,
/// the body is passed through untouched. Hop-by-hop headers are dropped,
/// X-Forwarded-* headers are added and the outbound version is HTTP/1.1.
pub fn rewrite_request<B>(
    req: Request<B>,
    target: &UpstreamTarget,
    client: &ClientIdentity,
    options: RewriteOptions,
) -> Result<Request<B>, HttpError> {
    let (mut parts, body) = req.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));

    let uri = Uri::builder()
        .scheme(target.scheme().clone())
        .authority(target.authority().clone())
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| HttpError::InvalidUri(e.to_string()))?;

    // HTTP/2 clients carry the host in the URI, not in a Host header
    let original_host = parts
        .headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()));

    remove_hop_by_hop_headers(&mut parts.headers);
    add_forwarded_headers(&mut parts.headers, client, original_host.as_deref(), options.is_https);

    let host = match (options.preserve_host, original_host) {
        (true, Some(original)) => original,
        _ => target.authority().as_str().to_string(),
    };
    let host = HeaderValue::from_str(&host)
        .map_err(|e| HttpError::FailedToGenerateUpstreamRequest(format!("invalid host: {e}")))?;
    parts.headers.insert(HOST, host);

    parts.uri = uri;
    parts.version = Version::HTTP_11;

    Ok(Request::from_parts(parts, body))
}
