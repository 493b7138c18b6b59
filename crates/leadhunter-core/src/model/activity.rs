// ── Lead activity audit trail ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity_id::EntityId;

/// Action type recorded when a lead changes pipeline stage.
pub const STATUS_CHANGE: &str = "status_change";

/// One append-only audit record for a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub lead_id: EntityId,
    /// Acting user; `None` for system or AI-originated actions.
    pub user_id: Option<String>,
    pub action_type: String,
    pub description: String,
    pub metadata: Value,
    pub performed_at: DateTime<Utc>,
}

/// Result of a best-effort audit write. Callers are free to ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    Recorded,
    /// The write failed; the failure has already been logged.
    Failed { reason: String },
    /// Nothing was written because the owning handle is closed.
    Skipped,
}

impl AuditOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded)
    }
}
