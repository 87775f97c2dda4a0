//! Scripted in-process fetcher for unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::errors::{Result, SyncError};
use crate::fetcher::ResourceFetcher;
use crate::keys::ResourceKey;

enum Reply {
    Ready(Result<Value>),
    Gated(oneshot::Receiver<Result<Value>>),
}

/// Answers fetches from per-key reply queues and counts issued fetches.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    replies: Mutex<HashMap<ResourceKey, VecDeque<Reply>>>,
    issued: Mutex<Vec<ResourceKey>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, key: &ResourceKey, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_default()
            .push_back(reply);
    }

    pub(crate) fn reply(&self, key: &ResourceKey, value: Value) {
        self.push(key, Reply::Ready(Ok(value)));
    }

    pub(crate) fn fail(&self, key: &ResourceKey, error: SyncError) {
        self.push(key, Reply::Ready(Err(error)));
    }

    /// Queue a reply that resolves when the returned sender fires.
    pub(crate) fn gate(&self, key: &ResourceKey) -> oneshot::Sender<Result<Value>> {
        let (tx, rx) = oneshot::channel();
        self.push(key, Reply::Gated(rx));
        tx
    }

    pub(crate) fn issued(&self, key: &ResourceKey) -> usize {
        self.issued
            .lock()
            .unwrap()
            .iter()
            .filter(|issued| *issued == key)
            .count()
    }

    pub(crate) fn total_issued(&self) -> usize {
        self.issued.lock().unwrap().len()
    }
}

#[async_trait]
impl ResourceFetcher for ScriptedFetcher {
    async fn fetch(&self, key: &ResourceKey) -> Result<Value> {
        self.issued.lock().unwrap().push(key.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(Reply::Ready(result)) => result,
            Some(Reply::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(SyncError::network("gate dropped"))),
            None => Err(SyncError::network(format!("no scripted reply for {}", key))),
        }
    }
}
