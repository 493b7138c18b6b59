// leadhunter-core: Reactive lead and campaign data layer between leadhunter-api and consumers (CLI).

pub mod audit;
pub mod campaigns;
pub mod config;
pub mod convert;
pub mod error;
mod handle;
pub mod leads;
pub mod model;
pub mod notify;
mod realtime;
mod store;
pub mod stream;
pub mod workspace;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use audit::ActivityLogger;
pub use campaigns::CampaignsHandle;
pub use config::{SignIn, TlsVerification, WorkspaceConfig};
pub use error::CoreError;
pub use leads::LeadsHandle;
pub use notify::{Notification, NotificationLevel, Notifier};
pub use store::FetchStatus;
pub use stream::EntityStream;
pub use workspace::Workspace;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ActivityEntry, AuditOutcome, Campaign, CampaignDraft, CampaignStatus, CampaignUpdate,
    EntityId, Lead, LeadFilter, LeadStatus, OpportunityTier, DEFAULT_CAMPAIGN_NAME, STATUS_CHANGE,
};
