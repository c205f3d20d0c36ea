mod loader;
mod rate_limit;
mod telemetry;
mod timeout;
mod types;

pub use loader::{load_from_path, validate};
pub use rate_limit::RateLimitConfig;
pub use telemetry::{LogFormat, LoggingConfig, TelemetryConfig};
pub use timeout::{KeepAliveConfig, TimeoutConfig};
pub use types::{Config, TlsConfig, UpstreamConfig};
