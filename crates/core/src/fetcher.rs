//! Boundary to the HTTP collaborator.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;
use crate::keys::ResourceKey;

/// Reads the raw JSON payload for a resource key.
///
/// The cache never inspects payloads; it only stores what the fetcher
/// returns and surfaces its errors on the entry.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, key: &ResourceKey) -> Result<Value>;
}
