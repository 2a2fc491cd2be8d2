//! Pending operation store
//!
//! Process-wide map from output id to an in-flight result. It is owned by no
//! orchestrator instance: a runtime that is torn down mid-call leaves its
//! entry here, and the next runtime that resolves a live handle for the same
//! output id consumes it. One store is created at startup and passed to every
//! executor.

use crate::reconciler::OutputPayload;
use ahash::{AHashMap, AHashSet};
use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Settled value of a pending operation; `Err` carries the rejection reason
pub type PendingResult = std::result::Result<OutputPayload, String>;

type SharedResult = Shared<BoxFuture<'static, PendingResult>>;

struct Entry {
    token: u64,
    future: SharedResult,
    /// Set once a consumer has attached; guarantees single delivery
    claimed: bool,
}

#[derive(Default)]
struct Entries {
    next_token: u64,
    by_output: AHashMap<String, Entry>,
    /// Claimed registrations replaced before settling; their consumer still delivers
    superseded_claims: AHashSet<u64>,
}

/// Who writes a settled result to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The operation's own caller writes it
    Caller,
    /// A consumer already attached and will write it
    Consumer,
}

#[derive(Clone, Default)]
pub struct PendingOperationStore {
    inner: Arc<Mutex<Entries>>,
}

/// Resolve/reject controls for an operation created with [`PendingOperationStore::register`]
pub struct PendingCompletion {
    output_id: String,
    token: u64,
    sender: oneshot::Sender<PendingResult>,
}

impl PendingCompletion {
    pub fn output_id(&self) -> &str {
        &self.output_id
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn resolve(self, payload: OutputPayload) {
        // The receiver is gone only when the entry was orphaned and nobody consumed it
        let _ = self.sender.send(Ok(payload));
    }

    pub fn reject(self, reason: impl Into<String>) {
        let _ = self.sender.send(Err(reason.into()));
    }
}

impl PendingOperationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an operation whose result will be supplied through the returned controls.
    ///
    /// Replaces any existing entry for `output_id`.
    pub fn register(&self, output_id: &str) -> PendingCompletion {
        let (sender, receiver) = oneshot::channel();
        let future = receiver.map(|received| {
            received.unwrap_or_else(|_| Err("Operation was dropped before settling".to_string()))
        });
        let token = self.register_future(output_id, future);

        PendingCompletion {
            output_id: output_id.to_string(),
            token,
            sender,
        }
    }

    /// Register an arbitrary future for `output_id`, replacing any existing entry.
    ///
    /// Returns the token identifying this registration.
    pub fn register_future<F>(&self, output_id: &str, future: F) -> u64
    where
        F: Future<Output = PendingResult> + Send + 'static,
    {
        let mut entries = self.entries();
        entries.next_token += 1;
        let token = entries.next_token;

        let previous = entries.by_output.insert(
            output_id.to_string(),
            Entry {
                token,
                future: future.boxed().shared(),
                claimed: false,
            },
        );

        if let Some(previous) = previous.filter(|p| p.future.peek().is_none()) {
            if previous.claimed {
                entries.superseded_claims.insert(previous.token);
            } else {
                tracing::warn!(
                    "Pending operation {} for '{}' orphaned by newer registration {}",
                    previous.token,
                    output_id,
                    token
                );
            }
        }
        tracing::debug!("Registered pending operation {} for '{}'", token, output_id);
        token
    }

    /// Attach `on_settle` to the pending operation for `output_id`.
    ///
    /// Returns `None` when there is no entry or another consumer already
    /// claimed it. The entry is removed as soon as the future settles, before
    /// `on_settle` runs.
    pub fn consume<F>(&self, output_id: &str, on_settle: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(PendingResult) + Send + 'static,
    {
        let (token, future) = {
            let mut entries = self.entries();
            let entry = entries.by_output.get_mut(output_id)?;
            if entry.claimed {
                return None;
            }
            entry.claimed = true;
            (entry.token, entry.future.clone())
        };

        tracing::debug!("Consuming pending operation {} for '{}'", token, output_id);
        let store = self.clone();
        let output_id = output_id.to_string();
        Some(tokio::spawn(async move {
            let result = future.await;
            store.remove_if_current(&output_id, token);
            on_settle(result);
        }))
    }

    /// Decide who delivers the result of registration `token`, before it is
    /// resolved. The entry is dropped if the caller delivers, so no consumer
    /// can claim it afterwards.
    ///
    /// A caller whose unclaimed entry was superseded still delivers its own
    /// result, so the last operation to settle performs the final write.
    pub fn take_delivery(&self, output_id: &str, token: u64) -> Delivery {
        let mut entries = self.entries();
        if entries.superseded_claims.remove(&token) {
            return Delivery::Consumer;
        }
        match entries.by_output.get(output_id) {
            Some(entry) if entry.token == token && entry.claimed => Delivery::Consumer,
            Some(entry) if entry.token == token => {
                entries.by_output.remove(output_id);
                Delivery::Caller
            }
            _ => Delivery::Caller,
        }
    }

    /// Whether registration `token` is still the live entry for `output_id`
    pub fn is_current(&self, output_id: &str, token: u64) -> bool {
        self.entries()
            .by_output
            .get(output_id)
            .is_some_and(|e| e.token == token)
    }

    pub fn contains(&self, output_id: &str) -> bool {
        self.entries().by_output.contains_key(output_id)
    }

    pub fn len(&self) -> usize {
        self.entries().by_output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_if_current(&self, output_id: &str, token: u64) {
        let mut entries = self.entries();
        if entries.by_output.get(output_id).is_some_and(|e| e.token == token) {
            entries.by_output.remove(output_id);
        }
    }
}
