use serde::Deserialize;
use std::net::SocketAddr;

use super::rate_limit::RateLimitConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};
use super::timeout::TimeoutConfig;

/// The single upstream every admitted request is forwarded to
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Upstream host name or IP literal (IPv6 without brackets is accepted)
    pub host: String,
    /// Upstream port
    /// Default: 80
    #[serde(default = "default_upstream_port")]
    pub port: u16,
    /// Upstream scheme. Only "http" is supported
    /// Default: "http"
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

impl UpstreamConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, scheme: default_scheme() }
    }
}

/// TLS termination configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to TLS certificate file (PEM format)
    /// File must exist and be readable at startup
    pub cert_path: String,
    /// Path to TLS private key file (PEM format)
    /// File must exist and be readable at startup
    pub key_path: String,
    /// Application-Layer Protocol Negotiation (ALPN) protocols
    /// Default: ["h2", "http/1.1"]
    #[serde(default = "default_alpn")]
    pub alpn: Vec<String>,
}

impl TlsConfig {
    pub fn new(cert_path: impl Into<String>, key_path: impl Into<String>) -> Self {
        Self { cert_path: cert_path.into(), key_path: key_path.into(), alpn: default_alpn() }
    }
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Default: "0.0.0.0:8080"
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Upstream server
    pub upstream: UpstreamConfig,
    /// Per-client admission control
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// TLS termination configuration (optional)
    /// If not provided, proxy operates in plain HTTP mode
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub timeout: TimeoutConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Forward the client's Host header instead of the upstream authority
    /// Default: false
    #[serde(default)]
    pub preserve_host: bool,
}

impl Config {
    /// Configuration with defaults for everything except the upstream
    pub fn for_upstream(host: impl Into<String>, port: u16) -> Self {
        Self {
            listen: default_listen(),
            upstream: UpstreamConfig::new(host, port),
            rate_limit: RateLimitConfig::default(),
            tls: None,
            logging: LoggingConfig::default(),
            timeout: TimeoutConfig::default(),
            telemetry: TelemetryConfig::default(),
            preserve_host: false,
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_upstream_port() -> u16 {
    80
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_alpn() -> Vec<String> {
    vec!["h2".to_string(), "http/1.1".to_string()]
}
