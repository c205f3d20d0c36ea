#![forbid(unsafe_code)]
//! Reverse proxy for a single HTTP upstream with per-client token bucket
//! rate limiting.
//!
//! Requests are admitted by [`security::LimiterRegistry`], rewritten and
//! forwarded by [`proxy::ProxyCore`], and reported through a
//! [`proxy::ProxyObserver`]. [`proxy::ReverseProxy`] ties the pieces together
//! and [`proxy::run`] serves it over plain TCP or TLS.

pub mod config;
pub mod error;
pub mod proxy;
pub mod security;
pub mod telemetry;
pub mod tls;

pub use config::{load_from_path, Config, RateLimitConfig, TlsConfig, UpstreamConfig};
pub use error::{ProxyError, Result};
pub use proxy::{run, ProxyObserver, ReverseProxy, TracingObserver, UpstreamTarget};
pub use security::{ClientIdentity, LimiterRegistry, RateLimitPolicy, TokenBucket};
pub use tls::build_tls_acceptor;
