// ── Leads data handle ──
//
// Fetches the lead pipeline (joined with company names), keeps it in a
// local reactive store, applies status changes optimistically after the
// backend confirms them, and audits every change.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use leadhunter_api::rows::{LEAD_SELECT, LeadRow};
use leadhunter_api::{Gateway, Query, Table};

use crate::audit::ActivityLogger;
use crate::convert::{decode_rows, encode, status_patch};
use crate::error::CoreError;
use crate::handle::HandleCore;
use crate::model::{AuditOutcome, EntityId, Lead, LeadFilter, LeadStatus, STATUS_CHANGE};
use crate::notify::Notifier;
use crate::realtime::Refresh;
use crate::store::{FetchOutcome, FetchStatus};
use crate::stream::EntityStream;

/// Live view of the leads matching one [`LeadFilter`].
///
/// Cheaply cloneable; clones share the same store. The handle stops its
/// realtime listener and refuses further writes once
/// [`close`](Self::close) is called or the last clone is dropped.
#[derive(Clone)]
pub struct LeadsHandle {
    inner: Arc<LeadsInner>,
}

struct LeadsInner {
    core: HandleCore<Lead>,
    filter: LeadFilter,
    audit: ActivityLogger,
}

impl LeadsHandle {
    /// Create an empty handle. Nothing is fetched until
    /// [`fetch_leads`](Self::fetch_leads).
    pub fn new(
        gateway: Arc<dyn Gateway>,
        filter: LeadFilter,
        notifier: Notifier,
        cancel: CancellationToken,
    ) -> Self {
        let audit = ActivityLogger::new(Arc::clone(&gateway));
        Self {
            inner: Arc::new(LeadsInner {
                core: HandleCore::new(gateway, Table::Leads, notifier, cancel),
                filter,
                audit,
            }),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current snapshot, newest first.
    pub fn leads(&self) -> Arc<Vec<Arc<Lead>>> {
        self.inner.core.store.snapshot()
    }

    pub fn lead(&self, id: &EntityId) -> Option<Arc<Lead>> {
        self.inner.core.store.get(id)
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> EntityStream<Lead> {
        self.inner.core.store.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.core.store.is_loading()
    }

    /// The last fetch or mutation error, cleared by the next successful fetch.
    pub fn error(&self) -> Option<CoreError> {
        self.inner.core.store.error()
    }

    pub fn filter(&self) -> LeadFilter {
        self.inner.filter
    }

    pub fn is_closed(&self) -> bool {
        self.inner.core.is_closed()
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Reload the snapshot from the backend.
    ///
    /// Errors never propagate: they land in [`error`](Self::error) and are
    /// announced as notifications. With `only_assigned_to_me` and no
    /// session the snapshot is cleared and the error is
    /// [`CoreError::AuthRequired`].
    pub async fn fetch_leads(&self) -> FetchStatus {
        self.inner.fetch().await
    }

    /// Move a lead to `status`.
    ///
    /// On success the lead is replaced in place, a `status_change` audit
    /// entry is written in the background, and `true` is returned. On
    /// failure nothing in the store changes (snapshot and error slot
    /// alike), an error notification is sent, and `false` is returned.
    pub async fn update_lead_status(&self, id: &EntityId, status: LeadStatus) -> bool {
        self.set_lead_status(id, status).await.is_ok()
    }

    /// Same as [`update_lead_status`](Self::update_lead_status), but hands
    /// the failure back to the caller.
    pub async fn set_lead_status(&self, id: &EntityId, status: LeadStatus) -> Result<(), CoreError> {
        let inner = &self.inner;
        if inner.core.is_closed() {
            return Err(CoreError::Disconnected);
        }
        let previous = inner.core.store.get(id).map(|lead| lead.status);

        let result = match encode(&status_patch(status, Utc::now())) {
            Ok(patch) => inner
                .core
                .gateway
                .update(Table::Leads, id.as_str(), patch)
                .await
                .map_err(CoreError::from),
            Err(e) => Err(e),
        };

        if let Err(err) = result {
            inner.core.report_failure("Erro ao atualizar status", &err);
            return Err(err);
        }

        if !inner.core.store.update(id, |lead| lead.with_status(status)) {
            debug!(lead = %id, "updated lead is not in the local snapshot");
        }
        info!(lead = %id, %status, "lead status updated");
        inner
            .core
            .notifier
            .success("Status atualizado", format!("Lead movido para {status}"));

        let description = match previous {
            Some(prev) => format!("Status alterado de {prev} para {status}"),
            None => format!("Status alterado para {status}"),
        };
        let metadata = json!({
            "old_status": previous.map(|s| s.to_string()),
            "new_status": status.to_string(),
        });
        let entry = inner
            .audit
            .entry(id, STATUS_CHANGE, &description, Some(metadata));
        inner.audit.record_detached(entry);
        Ok(())
    }

    /// Write an arbitrary audit entry for a lead and wait for it.
    ///
    /// Best-effort: failures are logged and reported in the outcome only.
    pub async fn log_lead_activity(
        &self,
        id: &EntityId,
        action_type: &str,
        description: &str,
        metadata: Option<Value>,
    ) -> AuditOutcome {
        if self.inner.core.is_closed() {
            return AuditOutcome::Skipped;
        }
        let entry = self
            .inner
            .audit
            .entry(id, action_type, description, metadata);
        self.inner.audit.record(entry).await
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Refetch on every change to the `leads` table.
    pub async fn watch_changes(&self) -> Result<(), CoreError> {
        let target: Weak<dyn Refresh> = Arc::<LeadsInner>::downgrade(&self.inner);
        self.inner.core.watch(target).await
    }

    pub async fn is_watching(&self) -> bool {
        self.inner.core.is_watching().await
    }

    /// Wait for background audit writes issued so far.
    pub async fn settle(&self) {
        if !self.inner.core.is_closed() {
            self.inner.audit.flush().await;
        }
    }

    /// Stop the realtime listener, refuse further writes, and wait for
    /// pending audit writes.
    pub async fn close(&self) {
        self.inner.core.close().await;
        self.inner.audit.close().await;
    }
}

impl LeadsInner {
    fn query(&self) -> Result<Query, CoreError> {
        let mut query = Query::new().select(LEAD_SELECT).order("created_at", false);

        if self.filter.only_assigned_to_me {
            let Some(session) = self.core.gateway.session() else {
                return Err(CoreError::auth_required(
                    "only_assigned_to_me needs a signed-in user",
                ));
            };
            query = query.eq("assigned_to", session.user_id);
        }
        if let Some(status) = self.filter.status {
            query = query.eq("status", status.to_string());
        }
        Ok(query)
    }

    async fn load(&self) -> FetchOutcome<Lead> {
        let query = match self.query() {
            Ok(q) => q,
            Err(err) => return FetchOutcome::Rejected(err),
        };
        match self.core.gateway.query(Table::Leads, &query).await {
            Ok(rows) => FetchOutcome::Loaded(decode_rows::<LeadRow, Lead>(Table::Leads, rows)),
            Err(e) => FetchOutcome::Failed(CoreError::from(e)),
        }
    }

    async fn fetch(&self) -> FetchStatus {
        self.core.fetch(self.load(), "Erro ao carregar leads").await
    }
}

#[async_trait]
impl Refresh for LeadsInner {
    async fn refresh(&self) {
        self.fetch().await;
    }
}

impl Drop for LeadsInner {
    fn drop(&mut self) {
        self.audit.close_now();
    }
}
