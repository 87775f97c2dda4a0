//! Client-side synchronization layer for the storefront.
//!
//! Views read server state through a [`SyncController`]: each resource is
//! addressed by a [`ResourceKey`], cached in a [`FetchCache`] entry, and
//! refreshed when a [`MutationExecutor`] invalidates it after a successful
//! write.

pub mod cache;
pub mod config;
pub mod controller;
pub mod errors;
pub mod fetcher;
pub mod invalidation;
pub mod keys;
pub mod models;
pub mod mutation;
pub mod storefront;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheEntry, FetchCache, FetchStatus};
pub use config::{QueryOptions, SyncConfig};
pub use controller::{Subscription, SyncController};
pub use errors::{Result, SyncError};
pub use fetcher::ResourceFetcher;
pub use invalidation::{Invalidation, InvalidationSet};
pub use keys::{Resource, ResourceKey};
pub use mutation::{MutationDef, MutationExecutor, MutationState};
pub use storefront::StoreMutation;
