// ── Lead domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::entity_id::EntityId;

/// Pipeline stage of a lead.
///
/// Any stage may move to any other; the data layer does not police
/// transitions.
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
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualifying,
    Meeting,
    Negotiation,
    Won,
    Lost,
}

/// Opportunity temperature assigned by scoring.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OpportunityTier {
    Hot,
    Warm,
    Cold,
}

/// A prospect contact at a company, as shown in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: EntityId,
    /// Company display name, falling back to the legal name, then to a
    /// placeholder.
    pub company_name: String,
    pub contact_name: String,
    pub status: LeadStatus,
    /// `None` means not yet classified.
    pub opportunity: Option<OpportunityTier>,
    pub last_action: Option<String>,
    pub last_action_at: Option<DateTime<Utc>>,
    /// `last_action_at` rendered as `dd/mm/yyyy HH:MM` (UTC).
    pub last_action_date: Option<String>,
    pub ai_recommendation: Option<String>,
    pub campaign: Option<String>,
    pub notes: Option<String>,
    /// Owning user id.
    pub assigned_to: Option<String>,
}

impl Lead {
    /// Copy of this lead in a different pipeline stage.
    #[must_use]
    pub fn with_status(&self, status: LeadStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// Which leads a handle loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeadFilter {
    /// Only leads assigned to the signed-in user. Requires a session.
    pub only_assigned_to_me: bool,
    /// Only leads in this stage.
    pub status: Option<LeadStatus>,
}

impl LeadFilter {
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mine(mut self) -> Self {
        self.only_assigned_to_me = true;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: LeadStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Contacted".parse::<LeadStatus>().unwrap(), LeadStatus::Contacted);
        assert_eq!(LeadStatus::Negotiation.as_ref(), "negotiation");
        assert!("archived".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn seven_pipeline_stages() {
        assert_eq!(LeadStatus::iter().count(), 7);
    }

    #[test]
    fn filter_builders_compose() {
        let f = LeadFilter::all().mine().with_status(LeadStatus::Won);
        assert!(f.only_assigned_to_me);
        assert_eq!(f.status, Some(LeadStatus::Won));
    }
}
