use serde::Deserialize;

/// Per-client token bucket configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Tokens added to each client's bucket per second (sustained rate)
    /// Default: 5.0
    #[serde(default = "default_refill_rate")]
    pub refill_rate: f64,
    /// Bucket capacity (maximum burst)
    /// Default: 10
    #[serde(default = "default_burst")]
    pub burst: u32,
    /// Upper bound on tracked clients. When reached, the least recently
    /// seen client's bucket is evicted to make room for a new one.
    /// Default: None (unbounded)
    #[serde(default)]
    pub max_clients: Option<usize>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { refill_rate: default_refill_rate(), burst: default_burst(), max_clients: None }
    }
}

fn default_refill_rate() -> f64 {
    5.0
}

fn default_burst() -> u32 {
    10
}
