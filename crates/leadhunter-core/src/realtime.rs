// ── Realtime subscription manager ──
//
// Bridges a gateway change feed to a data handle: every notification on
// the watched table triggers one full refetch. No incremental patching;
// the refetch reconciles local state with the backend.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use leadhunter_api::{Gateway, SubscriptionEvent, Table};

use crate::error::CoreError;

/// Something that can reload itself from the backend.
#[async_trait]
pub(crate) trait Refresh: Send + Sync {
    async fn refresh(&self);
}

/// A running change-feed listener for one table.
///
/// Stops when its token is cancelled, when the target is dropped, or when
/// the feed ends. The subscription is released on the way out.
pub(crate) struct RealtimeSync {
    table: Table,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RealtimeSync {
    pub(crate) async fn start(
        gateway: Arc<dyn Gateway>,
        table: Table,
        target: Weak<dyn Refresh>,
        cancel: CancellationToken,
    ) -> Result<Self, CoreError> {
        let mut subscription = gateway.subscribe(table).await?;
        info!(%table, "realtime subscription open");

        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    () = task_cancel.cancelled() => break,
                    event = subscription.recv() => event,
                };

                let Some(event) = event else {
                    debug!(%table, "change feed ended");
                    break;
                };
                match &event {
                    SubscriptionEvent::Changed(change) => {
                        debug!(%table, kind = %change.kind, "change notification, refetching");
                    }
                    SubscriptionEvent::Lagged(missed) => {
                        debug!(%table, missed, "change feed lagged, refetching once");
                    }
                }

                let Some(target) = target.upgrade() else {
                    break;
                };
                tokio::select! {
                    biased;
                    () = task_cancel.cancelled() => break,
                    () = target.refresh() => {}
                }
            }

            gateway.unsubscribe(subscription);
            debug!(%table, "realtime subscription closed");
        });

        Ok(Self {
            table,
            cancel,
            task,
        })
    }

    pub(crate) fn table(&self) -> Table {
        self.table
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop listening and wait for the subscription to be released.
    pub(crate) async fn stop(mut self) {
        self.cancel.cancel();
        let _ = (&mut self.task).await;
    }
}

impl Drop for RealtimeSync {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
