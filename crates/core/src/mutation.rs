//! Mutation executor: one write, its state, and its invalidations.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::cache::FetchCache;
use crate::errors::{Result, SyncError};
use crate::invalidation::InvalidationSet;

/// Definition of one kind of write against the server.
#[async_trait]
pub trait MutationDef: Send + Sync + 'static {
    type Input: Send + Sync;
    type Output: Clone + Send + Sync + 'static;

    /// Name used in logs and in [`SyncError::MutationPending`].
    fn name(&self) -> &'static str;

    async fn perform(&self, input: &Self::Input) -> Result<Self::Output>;

    /// Keys made stale by a successful invocation.
    fn invalidates(&self, input: &Self::Input, output: &Self::Output) -> InvalidationSet;
}

/// Observable state of the latest invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationState<O> {
    Idle,
    Pending,
    Success(O),
    Error(SyncError),
}

impl<O> MutationState<O> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn output(&self) -> Option<&O> {
        match self {
            Self::Success(output) => Some(output),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<O> {
        match self {
            Self::Success(output) => Ok(output),
            Self::Error(error) => Err(error),
            Self::Idle | Self::Pending => Err(SyncError::application(
                None,
                "mutation has not settled",
            )),
        }
    }
}

/// Clears the pending flag even if the invocation future is dropped.
struct PendingGuard<'a, O> {
    pending: &'a AtomicBool,
    state: &'a watch::Sender<MutationState<O>>,
}

impl<O> Drop for PendingGuard<'_, O> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if state.is_pending() {
                *state = MutationState::Idle;
                true
            } else {
                false
            }
        });
        self.pending.store(false, Ordering::Release);
    }
}

/// Runs a [`MutationDef`] from one initiation site.
///
/// At most one invocation is pending at a time; re-invoking while pending
/// is rejected without contacting the server.
pub struct MutationExecutor<M: MutationDef> {
    def: Arc<M>,
    cache: FetchCache,
    pending: AtomicBool,
    state: watch::Sender<MutationState<M::Output>>,
}

impl<M: MutationDef> MutationExecutor<M> {
    pub fn new(def: M, cache: FetchCache) -> Self {
        Self::from_shared(Arc::new(def), cache)
    }

    /// Executor over a definition shared with other initiation sites.
    pub fn from_shared(def: Arc<M>, cache: FetchCache) -> Self {
        let (state, _) = watch::channel(MutationState::Idle);
        Self {
            def,
            cache,
            pending: AtomicBool::new(false),
            state,
        }
    }

    pub fn definition(&self) -> &M {
        &self.def
    }

    pub fn state(&self) -> MutationState<M::Output> {
        self.state.borrow().clone()
    }

    /// Receiver observing `Idle -> Pending -> Success | Error` transitions.
    pub fn watch(&self) -> watch::Receiver<MutationState<M::Output>> {
        self.state.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Return to `Idle` unless an invocation is pending.
    pub fn reset(&self) {
        if !self.is_pending() {
            self.state.send_replace(MutationState::Idle);
        }
    }

    /// Perform the mutation; on success apply its invalidation set.
    pub async fn execute(&self, input: M::Input) -> MutationState<M::Output> {
        let name = self.def.name();
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Rejecting '{}': previous invocation still pending", name);
            return MutationState::Error(SyncError::MutationPending(name.to_string()));
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            state: &self.state,
        };

        let invocation = Uuid::new_v4();
        debug!("Mutation '{}' started ({})", name, invocation);
        self.state.send_replace(MutationState::Pending);

        let state = match self.def.perform(&input).await {
            Ok(output) => {
                let set = self.def.invalidates(&input, &output);
                let hit = self.cache.apply(&set);
                info!(
                    "Mutation '{}' succeeded ({}); invalidated {} entries from {} targets",
                    name,
                    invocation,
                    hit,
                    set.len()
                );
                MutationState::Success(output)
            }
            Err(err) => {
                warn!("Mutation '{}' failed ({}): {}", name, invocation, err);
                MutationState::Error(err)
            }
        };

        self.state.send_replace(state.clone());
        state
    }
}
