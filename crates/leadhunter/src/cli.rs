//! Clap derive structures for the `leadhunter` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use leadhunter_core::{CampaignStatus, LeadStatus};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// leadhunter -- work the sales pipeline from the command line
#[derive(Debug, Parser)]
#[command(
    name = "leadhunter",
    version,
    about = "Manage LeadHunter leads and campaigns from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "LEADHUNTER_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Project URL (overrides profile)
    #[arg(long, env = "LEADHUNTER_URL", global = true)]
    pub url: Option<String>,

    /// Public anon key (overrides profile)
    #[arg(long, env = "LEADHUNTER_ANON_KEY", global = true, hide_env = true)]
    pub anon_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LEADHUNTER_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "LEADHUNTER_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "LEADHUNTER_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and update leads
    #[command(alias = "l")]
    Leads(LeadsArgs),

    /// Manage outreach campaigns
    #[command(alias = "c")]
    Campaigns(CampaignsArgs),

    /// Stream snapshots as the backend reports changes
    Watch(WatchArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Leads ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LeadsArgs {
    #[command(subcommand)]
    pub command: LeadsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LeadsCommand {
    /// List leads, newest first
    #[command(alias = "ls")]
    List(LeadFilterArgs),

    /// Move a lead to another pipeline stage
    SetStatus {
        /// Lead id
        id: String,
        /// new, contacted, qualifying, meeting, negotiation, won, lost
        status: LeadStatus,
    },

    /// Record an activity on a lead
    Log {
        /// Lead id
        id: String,
        /// Action type (e.g. call, email, note)
        action_type: String,
        /// Free-text description
        description: String,
        /// Extra metadata as a JSON object
        #[arg(long)]
        meta: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct LeadFilterArgs {
    /// Only leads assigned to the signed-in user
    #[arg(long)]
    pub mine: bool,

    /// Only leads in this stage
    #[arg(long)]
    pub status: Option<LeadStatus>,
}

// ── Campaigns ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CampaignsArgs {
    #[command(subcommand)]
    pub command: CampaignsCommand,
}

#[derive(Debug, Subcommand)]
pub enum CampaignsCommand {
    /// List campaigns, newest first
    #[command(alias = "ls")]
    List {
        /// Only active campaigns
        #[arg(long)]
        active: bool,
    },

    /// Create a campaign; unset fields take defaults
    Create(CampaignFields),

    /// Update fields on a campaign
    Update {
        /// Campaign id
        id: String,
        #[command(flatten)]
        fields: CampaignFields,
    },

    /// Delete a campaign
    #[command(alias = "rm")]
    Delete {
        /// Campaign id
        id: String,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct CampaignFields {
    /// Campaign name
    #[arg(long)]
    pub name: Option<String>,

    /// Campaign objective
    #[arg(long)]
    pub objective: Option<String>,

    /// active, draft, paused, completed
    #[arg(long)]
    pub status: Option<CampaignStatus>,

    /// Where the campaign's leads come from
    #[arg(long)]
    pub source: Option<String>,

    /// Completion percentage (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub progress: Option<u8>,

    #[arg(long)]
    pub total_leads: Option<u32>,

    #[arg(long)]
    pub responses: Option<u32>,

    #[arg(long)]
    pub meetings: Option<u32>,

    /// Conversion rate (percent)
    #[arg(long)]
    pub conversion_rate: Option<f64>,

    #[arg(long)]
    pub remaining_days: Option<u32>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Watch campaigns instead of leads
    #[arg(long)]
    pub campaigns: bool,

    #[command(flatten)]
    pub filter: LeadFilterArgs,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
