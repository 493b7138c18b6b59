// ── Campaigns data handle ──
//
// All campaigns, newest first, with create/update/delete reconciled into
// the local snapshot once the backend accepts them. The "active" view is
// always derived from the same snapshot, never stored separately.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use leadhunter_api::rows::CampaignRow;
use leadhunter_api::{Gateway, Query, Table};

use crate::convert::{campaign_patch, decode_rows, encode, new_campaign_row};
use crate::error::CoreError;
use crate::handle::HandleCore;
use crate::model::{Campaign, CampaignDraft, CampaignUpdate, EntityId};
use crate::notify::Notifier;
use crate::realtime::Refresh;
use crate::store::{FetchOutcome, FetchStatus};
use crate::stream::EntityStream;

/// Live view of all campaigns.
///
/// Cheaply cloneable; clones share the same store.
#[derive(Clone)]
pub struct CampaignsHandle {
    inner: Arc<CampaignsInner>,
}

struct CampaignsInner {
    core: HandleCore<Campaign>,
}

impl CampaignsHandle {
    pub fn new(gateway: Arc<dyn Gateway>, notifier: Notifier, cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(CampaignsInner {
                core: HandleCore::new(gateway, Table::Campaigns, notifier, cancel),
            }),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current snapshot, newest first.
    pub fn campaigns(&self) -> Arc<Vec<Arc<Campaign>>> {
        self.inner.core.store.snapshot()
    }

    /// Campaigns whose status is `active`, in snapshot order.
    pub fn active_campaigns(&self) -> Vec<Arc<Campaign>> {
        self.campaigns()
            .iter()
            .filter(|c| c.is_active())
            .cloned()
            .collect()
    }

    pub fn campaign(&self, id: &EntityId) -> Option<Arc<Campaign>> {
        self.inner.core.store.get(id)
    }

    pub fn subscribe(&self) -> EntityStream<Campaign> {
        self.inner.core.store.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.core.store.is_loading()
    }

    pub fn error(&self) -> Option<CoreError> {
        self.inner.core.store.error()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.core.is_closed()
    }

    // ── Operations ───────────────────────────────────────────────────

    pub async fn fetch_campaigns(&self) -> FetchStatus {
        self.inner.fetch().await
    }

    /// Insert a campaign and put it at the front of the snapshot.
    ///
    /// Unset draft fields take their defaults. No refetch is issued.
    pub async fn create_campaign(&self, draft: CampaignDraft) -> Result<Campaign, CoreError> {
        let core = &self.inner.core;
        if core.is_closed() {
            return Err(CoreError::Disconnected);
        }

        match self.insert(draft).await {
            Ok(campaign) => {
                if !core.store.prepend(campaign.clone()) {
                    debug!(campaign = %campaign.id, "handle closed, not caching new campaign");
                }
                info!(campaign = %campaign.id, name = %campaign.name, "campaign created");
                core.notifier
                    .success("Campanha criada", campaign.name.clone());
                Ok(campaign)
            }
            Err(err) => {
                core.mutation_failed("Erro ao criar campanha", err.clone());
                Err(err)
            }
        }
    }

    /// Write the supplied fields and merge them into the cached campaign.
    pub async fn update_campaign(&self, id: &EntityId, update: CampaignUpdate) -> bool {
        let core = &self.inner.core;
        if core.is_closed() {
            return false;
        }
        if update.is_empty() {
            debug!(campaign = %id, "empty campaign update, nothing to write");
            core.notifier.success("Campanha atualizada", "");
            return true;
        }

        let result = match update.validate().and_then(|()| encode(&campaign_patch(&update))) {
            Ok(patch) => core
                .gateway
                .update(Table::Campaigns, id.as_str(), patch)
                .await
                .map_err(CoreError::from),
            Err(e) => Err(e),
        };

        if let Err(err) = result {
            core.mutation_failed("Erro ao atualizar campanha", err);
            return false;
        }

        if !core.store.update(id, |c| update.apply_to(c)) {
            debug!(campaign = %id, "updated campaign is not in the local snapshot");
        }
        info!(campaign = %id, "campaign updated");
        core.notifier.success("Campanha atualizada", "");
        true
    }

    /// Delete a campaign and drop it from the snapshot.
    pub async fn delete_campaign(&self, id: &EntityId) -> bool {
        let core = &self.inner.core;
        if core.is_closed() {
            return false;
        }

        if let Err(e) = core.gateway.delete(Table::Campaigns, id.as_str()).await {
            core.mutation_failed("Erro ao excluir campanha", CoreError::from(e));
            return false;
        }

        if !core.store.remove(id) {
            debug!(campaign = %id, "deleted campaign is not in the local snapshot");
        }
        info!(campaign = %id, "campaign deleted");
        core.notifier.success("Campanha excluída", "");
        true
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Refetch on every change to the `campaigns` table.
    pub async fn watch_changes(&self) -> Result<(), CoreError> {
        let target: Weak<dyn Refresh> = Arc::<CampaignsInner>::downgrade(&self.inner);
        self.inner.core.watch(target).await
    }

    pub async fn is_watching(&self) -> bool {
        self.inner.core.is_watching().await
    }

    pub async fn close(&self) {
        self.inner.core.close().await;
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn insert(&self, draft: CampaignDraft) -> Result<Campaign, CoreError> {
        draft.validate()?;
        let row = encode(&new_campaign_row(draft, Utc::now()))?;
        let inserted = self
            .inner
            .core
            .gateway
            .insert(Table::Campaigns, row)
            .await?;

        decode_rows::<CampaignRow, Campaign>(Table::Campaigns, inserted)
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::Internal("insert returned no campaign row".into()))
    }
}

impl CampaignsInner {
    async fn load(&self) -> FetchOutcome<Campaign> {
        let query = Query::new().order("created_at", false);
        match self.core.gateway.query(Table::Campaigns, &query).await {
            Ok(rows) => {
                FetchOutcome::Loaded(decode_rows::<CampaignRow, Campaign>(Table::Campaigns, rows))
            }
            Err(e) => FetchOutcome::Failed(CoreError::from(e)),
        }
    }

    async fn fetch(&self) -> FetchStatus {
        self.core.fetch(self.load(), "Erro ao carregar campanhas").await
    }
}

#[async_trait]
impl Refresh for CampaignsInner {
    async fn refresh(&self) {
        self.fetch().await;
    }
}
