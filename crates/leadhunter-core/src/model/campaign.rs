// ── Campaign domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::entity_id::EntityId;
use crate::error::CoreError;

/// Name given to campaigns created without one.
pub const DEFAULT_CAMPAIGN_NAME: &str = "Nova Campanha";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CampaignStatus {
    Active,
    #[default]
    Draft,
    Paused,
    Completed,
}

/// An outreach campaign and its funnel counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: EntityId,
    pub name: String,
    pub status: CampaignStatus,
    pub objective: String,
    /// Completion percentage, always within `0..=100`.
    pub progress: u8,
    pub total_leads: u32,
    pub lead_source: String,
    pub responses: u32,
    pub meetings: u32,
    /// Percentage.
    pub conversion_rate: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub remaining_days: u32,
}

impl Campaign {
    pub fn is_active(&self) -> bool {
        self.status == CampaignStatus::Active
    }
}

fn check_progress(progress: Option<u8>) -> Result<(), CoreError> {
    match progress {
        Some(p) if p > 100 => Err(CoreError::validation(format!(
            "progress must be between 0 and 100, got {p}"
        ))),
        _ => Ok(()),
    }
}

fn check_rate(rate: Option<f64>) -> Result<(), CoreError> {
    match rate {
        Some(r) if !r.is_finite() || r < 0.0 => Err(CoreError::validation(format!(
            "conversion rate must be a non-negative number, got {r}"
        ))),
        _ => Ok(()),
    }
}

/// Fields for a new campaign. Anything left unset takes its default:
/// [`DEFAULT_CAMPAIGN_NAME`], [`CampaignStatus::Draft`], empty text, zero
/// counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignDraft {
    pub name: Option<String>,
    pub status: Option<CampaignStatus>,
    pub objective: Option<String>,
    pub progress: Option<u8>,
    pub total_leads: Option<u32>,
    pub lead_source: Option<String>,
    pub responses: Option<u32>,
    pub meetings: Option<u32>,
    pub conversion_rate: Option<f64>,
    pub remaining_days: Option<u32>,
}

impl CampaignDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(CoreError::validation("campaign name cannot be blank"));
        }
        check_progress(self.progress)?;
        check_rate(self.conversion_rate)
    }
}

/// A partial campaign update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignUpdate {
    pub name: Option<String>,
    pub status: Option<CampaignStatus>,
    pub objective: Option<String>,
    pub progress: Option<u8>,
    pub total_leads: Option<u32>,
    pub lead_source: Option<String>,
    pub responses: Option<u32>,
    pub meetings: Option<u32>,
    pub conversion_rate: Option<f64>,
    pub remaining_days: Option<u32>,
}

impl CampaignUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(CoreError::validation("campaign name cannot be blank"));
        }
        check_progress(self.progress)?;
        check_rate(self.conversion_rate)
    }

    /// Merge the supplied fields over `campaign`.
    #[must_use]
    pub fn apply_to(&self, campaign: &Campaign) -> Campaign {
        let mut merged = campaign.clone();
        if let Some(name) = &self.name {
            merged.name.clone_from(name);
        }
        if let Some(status) = self.status {
            merged.status = status;
        }
        if let Some(objective) = &self.objective {
            merged.objective.clone_from(objective);
        }
        if let Some(progress) = self.progress {
            merged.progress = progress;
        }
        if let Some(total) = self.total_leads {
            merged.total_leads = total;
        }
        if let Some(source) = &self.lead_source {
            merged.lead_source.clone_from(source);
        }
        if let Some(responses) = self.responses {
            merged.responses = responses;
        }
        if let Some(meetings) = self.meetings {
            merged.meetings = meetings;
        }
        if let Some(rate) = self.conversion_rate {
            merged.conversion_rate = rate;
        }
        if let Some(days) = self.remaining_days {
            merged.remaining_days = days;
        }
        merged
    }
}
