use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{Result, SyncError};
use crate::keys::ResourceKey;
use crate::models;

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of one cached resource.
///
/// `Success` always carries a value and no error, `Error` the reverse.
/// While `Loading` after a previous success the last value is kept so views
/// can keep rendering it.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: ResourceKey,
    pub status: FetchStatus,
    pub value: Option<Value>,
    pub error: Option<SyncError>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Marked by invalidation; the next read fetches again.
    pub stale: bool,
}

impl CacheEntry {
    pub(crate) fn idle(key: ResourceKey) -> Self {
        Self {
            key,
            status: FetchStatus::Idle,
            value: None,
            error: None,
            last_fetched_at: None,
            stale: false,
        }
    }

    pub(crate) fn succeed(&mut self, value: Value, at: DateTime<Utc>) {
        self.status = FetchStatus::Success;
        self.value = Some(value);
        self.error = None;
        self.last_fetched_at = Some(at);
    }

    pub(crate) fn fail(&mut self, error: SyncError, at: DateTime<Utc>) {
        self.status = FetchStatus::Error;
        self.value = None;
        self.error = Some(error);
        self.last_fetched_at = Some(at);
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == FetchStatus::Error
    }

    /// Settled at least once and not waiting on a fetch.
    pub fn is_settled(&self) -> bool {
        matches!(self.status, FetchStatus::Success | FetchStatus::Error)
    }

    /// Served from cache without a network call.
    pub fn is_fresh(&self) -> bool {
        self.is_success() && !self.stale
    }

    /// Decode the current value; `Ok(None)` when there is none yet.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.value.as_ref().map(models::decode::<T>).transpose()
    }

    /// Settled outcome as a `Result`, decoding the value into `T`.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        match (self.status, self.value, self.error) {
            (FetchStatus::Error, _, Some(error)) => Err(error),
            (FetchStatus::Success, Some(value), _) => models::decode(&value),
            (status, _, _) => Err(SyncError::decode(format!(
                "entry {} has no settled value (status {:?})",
                self.key, status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;
    use serde_json::json;

    #[test]
    fn success_clears_error_and_error_clears_value() {
        let mut entry = CacheEntry::idle(ResourceKey::cart());
        entry.fail(SyncError::network("offline"), Utc::now());
        assert!(entry.is_error());
        assert!(entry.value.is_none());

        entry.succeed(json!({"items": []}), Utc::now());
        assert!(entry.is_success());
        assert!(entry.error.is_none());
        assert!(entry.is_fresh());
    }

    #[test]
    fn into_result_surfaces_entry_error() {
        let mut entry = CacheEntry::idle(ResourceKey::product("ghee"));
        entry.fail(SyncError::application(Some(404), "Product not found"), Utc::now());
        let err = entry.into_result::<Product>().unwrap_err();
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn unsettled_entry_has_no_result() {
        let entry = CacheEntry::idle(ResourceKey::wishlist());
        assert!(entry.decode::<Value>().expect("decode").is_none());
        assert!(entry.into_result::<Value>().is_err());
    }
}
