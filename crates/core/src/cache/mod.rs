//! Fetch cache: per-key entries, de-duplicated reads, invalidation.

mod entry;
mod fetch_cache;

pub use entry::*;
pub use fetch_cache::*;
