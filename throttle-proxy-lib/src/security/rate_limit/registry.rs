use ahash::RandomState;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{ClientIdentity, RateLimitPolicy, TokenBucket};
use crate::config::RateLimitConfig;
use crate::error::Result;

type BucketCache = LruCache<ClientIdentity, Arc<TokenBucket>, RandomState>;

/// Owner of every client's [`TokenBucket`].
///
/// A single mutex guards both the lookup and the insert so that two
/// concurrent first requests from one client always end up sharing the same
/// bucket. The lock is never held while a bucket decides or while a request
/// is forwarded. Lookups, inserts and evictions are all O(1).
pub struct LimiterRegistry {
    policy: RateLimitPolicy,
    max_clients: Option<NonZeroUsize>,
    buckets: Mutex<BucketCache>,
}

impl LimiterRegistry {
    /// Unbounded registry: buckets live as long as the registry.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            max_clients: None,
            buckets: Mutex::new(LruCache::unbounded_with_hasher(RandomState::new())),
        }
    }

    /// Registry tracking at most `max_clients` identities. Inserting past the
    /// bound evicts the least recently seen client.
    pub fn with_max_clients(policy: RateLimitPolicy, max_clients: usize) -> Self {
        let cap = NonZeroUsize::new(max_clients).unwrap_or(NonZeroUsize::MIN);
        Self {
            policy,
            max_clients: Some(cap),
            buckets: Mutex::new(LruCache::with_hasher(cap, RandomState::new())),
        }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Result<Self> {
        let policy = RateLimitPolicy::try_from(cfg)?;
        Ok(match cfg.max_clients {
            Some(max) => Self::with_max_clients(policy, max),
            None => Self::new(policy),
        })
    }

    /// Return the bucket for `identity`, creating it on first sight.
    ///
    /// A hit marks the client as most recently seen.
    pub fn get_or_create(&self, identity: &ClientIdentity) -> Arc<TokenBucket> {
        let mut buckets = self.lock();

        if let Some(bucket) = buckets.get(identity) {
            return Arc::clone(bucket);
        }

        let bucket = Arc::new(TokenBucket::new(self.policy, Instant::now()));
        if let Some((evicted, _)) = buckets.push(identity.clone(), Arc::clone(&bucket)) {
            debug!(client_ip = %evicted, "rate limit bucket evicted");
        }
        debug!(client_ip = %identity, clients = buckets.len(), "rate limit bucket created");
        bucket
    }

    /// Admission decision for one request from `identity`.
    pub fn check(&self, identity: &ClientIdentity) -> bool {
        // The registry lock is released before the bucket is consulted.
        let bucket = self.get_or_create(identity);
        bucket.allow()
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn max_clients(&self) -> Option<usize> {
        self.max_clients.map(NonZeroUsize::get)
    }

    /// Number of tracked identities
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `identity` currently has a bucket. Does not touch recency.
    pub fn contains(&self, identity: &ClientIdentity) -> bool {
        self.lock().contains(identity)
    }

    fn lock(&self) -> MutexGuard<'_, BucketCache> {
        self.buckets.lock().unwrap_or_else(|poisoned| {
            warn!("Limiter registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
