// ── Shared data-handle plumbing ──
//
// The parts of a data handle that do not depend on the entity: fetch
// bracketing and error reporting, the realtime listener slot, and
// teardown. `LeadsHandle` and `CampaignsHandle` wrap one of these.

use std::future::Future;
use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use leadhunter_api::{Gateway, Table};

use crate::error::CoreError;
use crate::notify::Notifier;
use crate::realtime::{RealtimeSync, Refresh};
use crate::store::{FetchOutcome, FetchStatus, Keyed, LocalStore};

pub(crate) struct HandleCore<T: Keyed + Send + Sync + 'static> {
    pub(crate) gateway: Arc<dyn Gateway>,
    pub(crate) store: LocalStore<T>,
    pub(crate) notifier: Notifier,
    table: Table,
    cancel: CancellationToken,
    realtime: Mutex<Option<RealtimeSync>>,
}

impl<T: Keyed + Send + Sync + 'static> HandleCore<T> {
    pub(crate) fn new(
        gateway: Arc<dyn Gateway>,
        table: Table,
        notifier: Notifier,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            store: LocalStore::new(cancel.clone()),
            notifier,
            table,
            cancel,
            realtime: Mutex::new(None),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.store.is_closed()
    }

    /// Run one fetch through the store's generation bracket.
    ///
    /// A failure that lands (is not stale) is logged and announced under
    /// `error_title`.
    pub(crate) async fn fetch<F>(&self, load: F, error_title: &str) -> FetchStatus
    where
        F: Future<Output = FetchOutcome<T>> + Send,
    {
        let Some(ticket) = self.store.begin_fetch() else {
            return FetchStatus::Closed;
        };

        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => FetchOutcome::Failed(CoreError::Disconnected),
            outcome = load => outcome,
        };

        let (failure, loaded) = match &outcome {
            FetchOutcome::Loaded(items) => (None, items.len()),
            FetchOutcome::Failed(err) | FetchOutcome::Rejected(err) => (Some(err.clone()), 0),
        };

        let status = self.store.finish_fetch(ticket, outcome);
        match (status, failure) {
            (FetchStatus::Applied, Some(err)) => {
                warn!(table = %self.table, error = %err, "fetch failed");
                self.notifier.error(error_title, err.to_string());
            }
            (FetchStatus::Applied, None) => {
                debug!(table = %self.table, rows = loaded, "snapshot replaced");
            }
            (FetchStatus::Stale, _) => {
                debug!(table = %self.table, "newer fetch in flight, discarding result");
            }
            (FetchStatus::Closed, _) => {}
        }
        status
    }

    /// Log a failed mutation and announce it under `title`.
    pub(crate) fn report_failure(&self, title: &str, err: &CoreError) {
        warn!(table = %self.table, error = %err, "{title}");
        self.notifier.error(title, err.to_string());
    }

    /// Report a failed mutation and park it in the error slot.
    pub(crate) fn mutation_failed(&self, title: &str, err: CoreError) {
        self.report_failure(title, &err);
        self.store.set_error(err);
    }

    /// Start the realtime listener unless one is already running.
    pub(crate) async fn watch(&self, target: Weak<dyn Refresh>) -> Result<(), CoreError> {
        if self.is_closed() {
            return Err(CoreError::Disconnected);
        }
        let mut slot = self.realtime.lock().await;
        if slot.as_ref().is_some_and(RealtimeSync::is_running) {
            return Ok(());
        }
        let sync = RealtimeSync::start(
            Arc::clone(&self.gateway),
            self.table,
            target,
            self.cancel.child_token(),
        )
        .await?;
        *slot = Some(sync);
        Ok(())
    }

    pub(crate) async fn is_watching(&self) -> bool {
        self.realtime
            .lock()
            .await
            .as_ref()
            .is_some_and(RealtimeSync::is_running)
    }

    /// Close the store and stop the realtime listener.
    pub(crate) async fn close(&self) {
        self.store.close();
        if let Some(sync) = self.realtime.lock().await.take() {
            debug!(table = %sync.table(), "stopping realtime listener");
            sync.stop().await;
        }
    }
}

impl<T: Keyed + Send + Sync + 'static> Drop for HandleCore<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
