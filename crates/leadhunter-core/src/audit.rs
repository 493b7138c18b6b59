// ── Lead activity logger ──
//
// Best-effort writer for the `lead_activities` audit table. A failed write
// is logged and reported as `AuditOutcome::Failed`; it never reaches the
// mutation that triggered it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Notify;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use leadhunter_api::rows::ActivityLogRow;
use leadhunter_api::{Gateway, Table};

use crate::model::{ActivityEntry, AuditOutcome, EntityId};

#[derive(Clone)]
pub struct ActivityLogger {
    gateway: Arc<dyn Gateway>,
    tracker: TaskTracker,
    pending: Arc<Pending>,
}

/// Background writes scheduled and not yet finished.
#[derive(Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl ActivityLogger {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            tracker: TaskTracker::new(),
            pending: Arc::new(Pending::default()),
        }
    }

    /// Build an entry stamped with the session user (if any) and now.
    pub fn entry(
        &self,
        lead_id: &EntityId,
        action_type: &str,
        description: &str,
        metadata: Option<Value>,
    ) -> ActivityEntry {
        ActivityEntry {
            lead_id: lead_id.clone(),
            user_id: self.gateway.session().map(|s| s.user_id),
            action_type: action_type.to_owned(),
            description: description.to_owned(),
            metadata: metadata.unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            performed_at: Utc::now(),
        }
    }

    /// Write one entry and wait for the outcome.
    pub async fn record(&self, entry: ActivityEntry) -> AuditOutcome {
        let lead_id = entry.lead_id.clone();
        let action_type = entry.action_type.clone();

        let row = match serde_json::to_value(ActivityLogRow::from(entry)) {
            Ok(row) => row,
            Err(e) => {
                warn!(lead = %lead_id, error = %e, "could not encode activity entry");
                return AuditOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match self.gateway.insert(Table::LeadActivities, row).await {
            Ok(_) => {
                debug!(lead = %lead_id, action = %action_type, "activity recorded");
                AuditOutcome::Recorded
            }
            Err(e) => {
                warn!(lead = %lead_id, action = %action_type, error = %e, "failed to record lead activity");
                AuditOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Write one entry in the background. Returns `false` if the logger has
    /// been closed and nothing was scheduled.
    pub fn record_detached(&self, entry: ActivityEntry) -> bool {
        if self.tracker.is_closed() {
            debug!(lead = %entry.lead_id, "activity logger closed, dropping entry");
            return false;
        }
        let logger = self.clone();
        self.pending.count.fetch_add(1, Ordering::AcqRel);
        self.tracker.spawn(async move {
            let _ = logger.record(entry).await;
            if logger.pending.count.fetch_sub(1, Ordering::AcqRel) == 1 {
                logger.pending.idle.notify_waiters();
            }
        });
        true
    }

    /// Wait for every background write scheduled so far. Writes scheduled
    /// meanwhile are waited for too; none are refused.
    pub async fn flush(&self) {
        loop {
            let idle = self.pending.idle.notified();
            if self.pending.count.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Stop accepting background writes and wait for the pending ones.
    pub async fn close(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    pub(crate) fn close_now(&self) {
        self.tracker.close();
    }
}
