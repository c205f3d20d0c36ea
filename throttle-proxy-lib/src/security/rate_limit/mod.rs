//! Per-client rate limiting.
//!
//! Each client host gets its own continuous token bucket:
//!
//! 1. **ClientIdentity** (`identity.rs`): the peer address with the port
//!    stripped, so all connections from one host share a bucket.
//!
//! 2. **TokenBucket** (`bucket.rs`): lazy refill at `refill_rate` tokens per
//!    second up to `burst`, one token per admitted request.
//!
//! 3. **LimiterRegistry** (`registry.rs`): identity → bucket map with an
//!    atomic get-or-create, owned by the proxy instance. With `max_clients`
//!    set it is an LRU cache and evicts the least recently seen client in
//!    constant time.
//!
//! # Example Usage
//!
//! ```ignore
//! use throttle_proxy_lib::security::rate_limit::{ClientIdentity, LimiterRegistry, RateLimitPolicy};
//!
//! // 5 requests per second sustained, bursts of 10
//! let registry = LimiterRegistry::new(RateLimitPolicy::new(5.0, 10)?);
//!
//! let client = ClientIdentity::from_remote_addr("203.0.113.5:8080");
//! if registry.check(&client) {
//!     // forward the request
//! } else {
//!     // 429 Too Many Requests
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [rate_limit]
//! refill_rate = 5.0
//! burst = 10
//! max_clients = 100000
//! ```

mod bucket;
mod identity;
mod registry;

pub use bucket::{RateLimitPolicy, TokenBucket};
pub use identity::ClientIdentity;
pub use registry::LimiterRegistry;
