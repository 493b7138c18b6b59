// ── Row-to-domain conversions ──
//
// The single mapping boundary between `leadhunter_api::rows` records and
// the domain model. Missing or unrecognized values never fail a mapping:
// they fall back to a default and are logged at debug level.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use leadhunter_api::Table;
use leadhunter_api::rows::{
    ActivityLogRow, CampaignPatch, CampaignRow, LeadRow, LeadStatusPatch, NewCampaignRow,
};

use crate::error::CoreError;
use crate::model::{
    ActivityEntry, Campaign, CampaignDraft, CampaignStatus, CampaignUpdate, DEFAULT_CAMPAIGN_NAME,
    EntityId, Lead, LeadStatus, OpportunityTier,
};

/// Shown when a lead's company has neither a display nor a legal name.
pub const UNNAMED_COMPANY: &str = "Empresa sem nome";

/// Shown when a lead has no contact name.
pub const UNSPECIFIED_CONTACT: &str = "Contato não informado";

const ACTION_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

// ── Helpers ────────────────────────────────────────────────────────

/// Render a last-action timestamp for display.
pub fn format_action_date(at: &DateTime<Utc>) -> String {
    at.format(ACTION_DATE_FORMAT).to_string()
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

fn parse_lead_status(id: &str, raw: Option<&str>) -> LeadStatus {
    match raw.map(str::parse::<LeadStatus>) {
        Some(Ok(status)) => status,
        Some(Err(_)) => {
            debug!(lead = id, status = raw, "unrecognized lead status, treating as new");
            LeadStatus::New
        }
        None => {
            debug!(lead = id, "lead without status, treating as new");
            LeadStatus::New
        }
    }
}

fn parse_tier(id: &str, raw: Option<&str>) -> Option<OpportunityTier> {
    let raw = raw.filter(|s| !s.is_empty())?;
    if let Ok(tier) = raw.parse() {
        Some(tier)
    } else {
        debug!(lead = id, opportunity = raw, "unrecognized opportunity tier, leaving unclassified");
        None
    }
}

fn parse_campaign_status(id: &str, raw: Option<&str>) -> CampaignStatus {
    if let Some(Ok(status)) = raw.map(str::parse::<CampaignStatus>) {
        status
    } else {
        debug!(campaign = id, status = raw, "unrecognized campaign status, treating as draft");
        CampaignStatus::Draft
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn clamp_progress(id: &str, raw: Option<f64>) -> u8 {
    let value = raw.unwrap_or(0.0);
    if !(0.0..=100.0).contains(&value) {
        debug!(campaign = id, progress = value, "progress out of range, clamping");
    }
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0).round() as u8
}

fn count(raw: Option<i64>) -> u32 {
    raw.and_then(|n| u32::try_from(n).ok()).unwrap_or(0)
}

// ── Leads ──────────────────────────────────────────────────────────

impl From<LeadRow> for Lead {
    fn from(row: LeadRow) -> Self {
        let company = row.companies.unwrap_or_default();
        let company_name = non_blank(company.name)
            .or_else(|| non_blank(company.legal_name))
            .unwrap_or_else(|| UNNAMED_COMPANY.to_owned());
        let contact_name =
            non_blank(row.contact_name).unwrap_or_else(|| UNSPECIFIED_CONTACT.to_owned());

        let status = parse_lead_status(&row.id, row.status.as_deref());
        let opportunity = parse_tier(&row.id, row.opportunity_type.as_deref());

        Lead {
            id: EntityId::from(row.id),
            company_name,
            contact_name,
            status,
            opportunity,
            last_action: row.last_action,
            last_action_date: row.last_action_date.as_ref().map(format_action_date),
            last_action_at: row.last_action_date,
            ai_recommendation: row.ai_recommendation,
            campaign: row.campaign,
            notes: row.notes,
            assigned_to: row.assigned_to,
        }
    }
}

pub(crate) fn status_patch(status: LeadStatus, now: DateTime<Utc>) -> LeadStatusPatch {
    LeadStatusPatch {
        status: status.to_string(),
        updated_at: now,
    }
}

// ── Campaigns ──────────────────────────────────────────────────────

impl From<CampaignRow> for Campaign {
    fn from(row: CampaignRow) -> Self {
        let status = parse_campaign_status(&row.id, row.status.as_deref());
        let progress = clamp_progress(&row.id, row.progress);

        Campaign {
            name: non_blank(row.name).unwrap_or_else(|| DEFAULT_CAMPAIGN_NAME.to_owned()),
            status,
            objective: row.objective.unwrap_or_default(),
            progress,
            total_leads: count(row.total_leads),
            lead_source: row.lead_source.unwrap_or_default(),
            responses: count(row.responses),
            meetings: count(row.meetings),
            conversion_rate: row.conversion_rate.filter(|r| r.is_finite()).unwrap_or(0.0),
            created_at: row.created_at,
            remaining_days: count(row.remaining_days),
            id: EntityId::from(row.id),
        }
    }
}

pub(crate) fn new_campaign_row(draft: CampaignDraft, now: DateTime<Utc>) -> NewCampaignRow {
    NewCampaignRow {
        name: draft.name.unwrap_or_else(|| DEFAULT_CAMPAIGN_NAME.to_owned()),
        status: draft.status.unwrap_or_default().to_string(),
        objective: draft.objective.unwrap_or_default(),
        progress: draft.progress.unwrap_or(0),
        total_leads: draft.total_leads.unwrap_or(0),
        lead_source: draft.lead_source.unwrap_or_default(),
        responses: draft.responses.unwrap_or(0),
        meetings: draft.meetings.unwrap_or(0),
        conversion_rate: draft.conversion_rate.unwrap_or(0.0),
        created_at: now,
        remaining_days: draft.remaining_days.unwrap_or(0),
    }
}

pub(crate) fn campaign_patch(update: &CampaignUpdate) -> CampaignPatch {
    CampaignPatch {
        name: update.name.clone(),
        status: update.status.map(|s| s.to_string()),
        objective: update.objective.clone(),
        progress: update.progress,
        total_leads: update.total_leads,
        lead_source: update.lead_source.clone(),
        responses: update.responses,
        meetings: update.meetings,
        conversion_rate: update.conversion_rate,
        remaining_days: update.remaining_days,
    }
}

// ── Activity ───────────────────────────────────────────────────────

impl From<ActivityEntry> for ActivityLogRow {
    fn from(entry: ActivityEntry) -> Self {
        ActivityLogRow {
            lead_id: entry.lead_id.to_string(),
            user_id: entry.user_id,
            action_type: entry.action_type,
            description: entry.description,
            metadata: entry.metadata,
            performed_at: entry.performed_at,
        }
    }
}

// ── Batch decoding ─────────────────────────────────────────────────

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Value, CoreError> {
    serde_json::to_value(value)
        .map_err(|e| CoreError::Internal(format!("could not encode row: {e}")))
}

/// Decode raw gateway rows into domain values, skipping rows that do not
/// match the expected record shape.
pub(crate) fn decode_rows<R, T>(table: Table, rows: Vec<Value>) -> Vec<T>
where
    R: DeserializeOwned,
    T: From<R>,
{
    rows.into_iter()
        .filter_map(|raw| match serde_json::from_value::<R>(raw) {
            Ok(row) => Some(T::from(row)),
            Err(e) => {
                warn!(%table, error = %e, "skipping malformed row");
                None
            }
        })
        .collect()
}
