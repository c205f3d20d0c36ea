use http::uri::{Authority, Scheme};
use std::fmt;

use crate::config::UpstreamConfig;
use crate::error::{ProxyError, Result};

/// The upstream every admitted request is forwarded to.
///
/// Parsed once at construction and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    scheme: Scheme,
    authority: Authority,
    host: String,
    port: u16,
}

impl UpstreamTarget {
    /// Plain HTTP upstream at `host:port`.
    ///
    /// # Errors
    /// `ProxyError::Config` for an empty host or port 0,
    /// `ProxyError::InvalidUri` when `host:port` is not a valid authority.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_scheme("http", host, port)
    }

    pub fn from_config(cfg: &UpstreamConfig) -> Result<Self> {
        Self::with_scheme(&cfg.scheme, &cfg.host, cfg.port)
    }

    fn with_scheme(scheme: &str, host: &str, port: u16) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ProxyError::Config("upstream host cannot be empty".to_string()));
        }
        if port == 0 {
            return Err(ProxyError::Config("upstream port must be > 0".to_string()));
        }

        let scheme: Scheme = scheme.parse()?;
        if scheme != Scheme::HTTP {
            return Err(ProxyError::Config(format!("unsupported upstream scheme: {scheme}")));
        }

        // Bare IPv6 literals need brackets before a port can follow
        let authority = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        let authority: Authority = authority.parse()?;

        Ok(Self { scheme, authority, host: host.to_string(), port })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}
