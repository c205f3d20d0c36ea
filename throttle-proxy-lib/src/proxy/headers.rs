use http::header::{
    CONNECTION, HOST, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING,
    UPGRADE,
};
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::security::ClientIdentity;

/// X-Forwarded-* header names
pub mod forwarded {
    pub const FOR: &str = "x-forwarded-for";
    pub const HOST: &str = "x-forwarded-host";
    pub const PROTO: &str = "x-forwarded-proto";
}

const KEEP_ALIVE: &str = "keep-alive";
const PROXY_CONNECTION: &str = "proxy-connection";

/// Strip connection-scoped headers (RFC 9110 §7.6.1).
///
/// Headers named by `Connection` are removed first, then the fixed set.
pub fn remove_hop_by_hop_headers(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(&name);
    }

    let fixed = [
        CONNECTION,
        TE,
        TRAILER,
        TRANSFER_ENCODING,
        UPGRADE,
        PROXY_AUTHORIZATION,
        PROXY_AUTHENTICATE,
    ];
    for name in fixed {
        headers.remove(name);
    }
    headers.remove(KEEP_ALIVE);
    headers.remove(PROXY_CONNECTION);
}

/// Add X-Forwarded-* headers for the upstream.
///
/// `X-Forwarded-For` gets the client appended to any existing chain,
/// `X-Forwarded-Host` carries the inbound host (`original_host`, falling back to
/// the `Host` header) and `X-Forwarded-Proto` the inbound scheme.
pub fn add_forwarded_headers(
    headers: &mut HeaderMap,
    client: &ClientIdentity,
    original_host: Option<&str>,
    is_https: bool,
) {
    let client_ip = client.ip();
    let chain = match headers.get(forwarded::FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {client_ip}"),
        _ => client_ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(forwarded::FOR, value);
    }

    let host = original_host
        .map(str::to_string)
        .or_else(|| headers.get(HOST).and_then(|h| h.to_str().ok()).map(str::to_string));
    if let Some(value) = host.and_then(|h| HeaderValue::from_str(&h).ok()) {
        headers.insert(forwarded::HOST, value);
    }

    let proto = if is_https { "https" } else { "http" };
    headers.insert(forwarded::PROTO, HeaderValue::from_static(proto));
}
