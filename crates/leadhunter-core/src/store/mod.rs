// ── Per-handle reactive store ──
//
// Each data handle owns exactly one `LocalStore`: the entity snapshot, a
// loading flag, and an error slot. Fetches are stamped with a generation
// number so a slow response can never overwrite a newer one. Once the
// owning handle's token is cancelled the store refuses every write.

mod collection;

use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub(crate) use collection::{EntityCollection, Keyed, Snapshot};

use crate::error::CoreError;
use crate::model::EntityId;
use crate::stream::EntityStream;

/// Proof that a fetch was started; hand it back to [`LocalStore::finish_fetch`].
#[derive(Debug)]
#[must_use = "a started fetch must be finished or the loading flag stays raised"]
pub(crate) struct FetchTicket {
    generation: u64,
}

/// What a fetch produced.
pub(crate) enum FetchOutcome<T> {
    /// Replace the snapshot and clear the error slot.
    Loaded(Vec<T>),
    /// Keep the snapshot, record the error.
    Failed(CoreError),
    /// Clear the snapshot, record the error (the caller may not see the
    /// previous data at all).
    Rejected(CoreError),
}

/// How a finished fetch was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The result landed in the store.
    Applied,
    /// A newer fetch was issued meanwhile; this result was discarded.
    Stale,
    /// The handle was closed; nothing was written.
    Closed,
}

#[derive(Debug, Default)]
struct FetchState {
    /// Newest generation handed out.
    issued: u64,
    /// Fetches started and not yet finished.
    in_flight: usize,
}

pub(crate) struct LocalStore<T: Keyed + Send + Sync + 'static> {
    items: EntityCollection<T>,
    loading: watch::Sender<bool>,
    error: watch::Sender<Option<CoreError>>,
    state: Mutex<FetchState>,
    cancel: CancellationToken,
}

impl<T: Keyed + Send + Sync + 'static> LocalStore<T> {
    pub(crate) fn new(cancel: CancellationToken) -> Self {
        let (loading, _) = watch::channel(false);
        let (error, _) = watch::channel(None);
        Self {
            items: EntityCollection::new(),
            loading,
            error,
            state: Mutex::new(FetchState::default()),
            cancel,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FetchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.items.snapshot()
    }

    pub(crate) fn get(&self, key: &EntityId) -> Option<std::sync::Arc<T>> {
        self.items.get(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn subscribe(&self) -> EntityStream<T> {
        EntityStream::new(self.items.subscribe())
    }

    pub(crate) fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub(crate) fn error(&self) -> Option<CoreError> {
        self.error.borrow().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // ── Fetch bracketing ─────────────────────────────────────────────

    /// Stamp a new fetch and raise the loading flag.
    /// Returns `None` once the store is closed.
    pub(crate) fn begin_fetch(&self) -> Option<FetchTicket> {
        let mut state = self.state();
        if self.is_closed() {
            return None;
        }
        state.issued += 1;
        state.in_flight += 1;
        let generation = state.issued;
        drop(state);

        self.loading.send_replace(true);
        Some(FetchTicket { generation })
    }

    /// Settle a fetch. The loading flag drops once no fetch is in flight;
    /// the outcome is applied only if no newer fetch has been issued.
    #[allow(clippy::needless_pass_by_value)]
    pub(crate) fn finish_fetch(&self, ticket: FetchTicket, outcome: FetchOutcome<T>) -> FetchStatus {
        let mut state = self.state();
        state.in_flight = state.in_flight.saturating_sub(1);
        let still_loading = state.in_flight > 0;
        let status = if self.is_closed() {
            FetchStatus::Closed
        } else if ticket.generation < state.issued {
            FetchStatus::Stale
        } else {
            FetchStatus::Applied
        };

        // Apply while holding the state lock so `close` cannot interleave.
        if status == FetchStatus::Applied {
            match outcome {
                FetchOutcome::Loaded(items) => {
                    self.items.replace(items);
                    self.error.send_replace(None);
                }
                FetchOutcome::Failed(err) => {
                    self.error.send_replace(Some(err));
                }
                FetchOutcome::Rejected(err) => {
                    self.items.replace(Vec::new());
                    self.error.send_replace(Some(err));
                }
            }
        }
        drop(state);

        self.loading
            .send_replace(still_loading && status != FetchStatus::Closed);
        status
    }

    // ── Local mutations ──────────────────────────────────────────────
    //
    // Each returns `false` without touching anything once closed.

    pub(crate) fn update(&self, key: &EntityId, f: impl FnOnce(&T) -> T) -> bool {
        let _state = self.state();
        !self.is_closed() && self.items.update(key, f)
    }

    pub(crate) fn prepend(&self, item: T) -> bool {
        let _state = self.state();
        if self.is_closed() {
            return false;
        }
        self.items.prepend(item);
        true
    }

    pub(crate) fn remove(&self, key: &EntityId) -> bool {
        let _state = self.state();
        !self.is_closed() && self.items.remove(key).is_some()
    }

    pub(crate) fn set_error(&self, err: CoreError) {
        let _state = self.state();
        if !self.is_closed() {
            self.error.send_replace(Some(err));
        }
    }

    /// Refuse all further writes. The last snapshot stays readable.
    pub(crate) fn close(&self) {
        let _state = self.state();
        self.cancel.cancel();
        self.loading.send_replace(false);
    }
}
