// ── Typed row records ──
//
// One record type per table shape the data layer touches. Every column the
// backend may leave NULL is an `Option`; defaulting happens in the core's
// mapping layer, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Projection used when fetching leads: every lead column plus the parent
/// company's display and legal names.
pub const LEAD_SELECT: &str = "*,companies(name,legal_name)";

// ── Leads ──────────────────────────────────────────────────────────

/// A `leads` row joined with its parent `companies` row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeadRow {
    pub id: String,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub opportunity_type: Option<String>,
    #[serde(default)]
    pub last_action: Option<String>,
    #[serde(default)]
    pub last_action_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ai_recommendation: Option<String>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Embedded parent company (absent when the join found nothing).
    #[serde(default)]
    pub companies: Option<CompanyRef>,
}

/// The subset of a `companies` row embedded into lead queries.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompanyRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub legal_name: Option<String>,
}

/// Patch body for a lead status transition.
#[derive(Debug, Clone, Serialize)]
pub struct LeadStatusPatch {
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

// ── Campaigns ──────────────────────────────────────────────────────

/// A `campaigns` row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CampaignRow {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub total_leads: Option<i64>,
    #[serde(default)]
    pub lead_source: Option<String>,
    #[serde(default)]
    pub responses: Option<i64>,
    #[serde(default)]
    pub meetings: Option<i64>,
    #[serde(default)]
    pub conversion_rate: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remaining_days: Option<i64>,
}

/// Insert body for a new campaign. The backend assigns `id`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCampaignRow {
    pub name: String,
    pub status: String,
    pub objective: String,
    pub progress: u8,
    pub total_leads: u32,
    pub lead_source: String,
    pub responses: u32,
    pub meetings: u32,
    pub conversion_rate: f64,
    pub created_at: DateTime<Utc>,
    pub remaining_days: u32,
}

/// Partial update body for a campaign. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CampaignPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_leads: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meetings: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_days: Option<u32>,
}

// ── Lead activity log ──────────────────────────────────────────────

/// Insert body for one audit record in `lead_activities`.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityLogRow {
    pub lead_id: String,
    /// `None` for system or AI-originated actions.
    pub user_id: Option<String>,
    pub action_type: String,
    pub description: String,
    pub metadata: Value,
    pub performed_at: DateTime<Utc>,
}
