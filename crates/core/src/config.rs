//! Fetch policy configuration.

use rand::Rng;
use std::time::Duration;

use crate::keys::ResourceKey;

const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;
const MAX_RETRY_DELAY_MS: u64 = 8_000;

/// Policy applied to every fetch attempt for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Extra attempts after a retryable failure. Zero disables retry.
    pub retry: u32,
    pub retry_base_delay: Duration,
    /// Upper bound for one attempt; `None` leaves it to the transport.
    pub timeout: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            retry: 0,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            timeout: None,
        }
    }
}

impl QueryOptions {
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Exponential backoff with up to 20% jitter for the given 1-based attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.retry_base_delay.as_millis() as u64;
        let exp = attempt.saturating_sub(1).min(8);
        let backoff = base_ms.saturating_mul(1_u64 << exp).min(MAX_RETRY_DELAY_MS);
        let jitter = rand::thread_rng().gen_range(0..=(backoff / 5).max(1));
        Duration::from_millis(backoff.saturating_add(jitter))
    }
}

/// Configuration of a [`crate::SyncController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Options for keys without an override.
    pub query: QueryOptions,
    overrides: Vec<(ResourceKey, QueryOptions)>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            query: QueryOptions::default(),
            // Identity checks never retry: a signed-out user is an answer, not a failure.
            overrides: vec![(ResourceKey::auth_user(), QueryOptions::default())],
        }
    }
}

impl SyncConfig {
    pub fn with_query_options(mut self, options: QueryOptions) -> Self {
        self.query = options;
        self
    }

    /// Override the options for every key starting with `prefix`.
    pub fn with_key_options(mut self, prefix: ResourceKey, options: QueryOptions) -> Self {
        self.overrides.retain(|(existing, _)| existing != &prefix);
        self.overrides.push((prefix, options));
        self
    }

    /// Options for `key`: the longest matching override, else the default.
    pub fn options_for(&self, key: &ResourceKey) -> &QueryOptions {
        self.overrides
            .iter()
            .filter(|(prefix, _)| key.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, options)| options)
            .unwrap_or(&self.query)
    }
}
