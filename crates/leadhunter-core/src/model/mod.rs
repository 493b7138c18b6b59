// ── Domain model ──
//
// Canonical lead, campaign, and activity types. Everything consumers see
// comes from here; backend row shapes stay in `leadhunter_api::rows`.

pub mod activity;
pub mod campaign;
pub mod entity_id;
pub mod lead;

pub use activity::{ActivityEntry, AuditOutcome, STATUS_CHANGE};
pub use campaign::{
    Campaign, CampaignDraft, CampaignStatus, CampaignUpdate, DEFAULT_CAMPAIGN_NAME,
};
pub use entity_id::EntityId;
pub use lead::{Lead, LeadFilter, LeadStatus, OpportunityTier};
