//! Lead command handlers.

use std::sync::Arc;

use tabled::Tabled;

use leadhunter_core::{AuditOutcome, EntityId, Lead, LeadFilter, Workspace, WorkspaceConfig};

use crate::cli::{GlobalOpts, LeadFilterArgs, LeadsArgs, LeadsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LeadRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Company")]
    company: String,
    #[tabled(rename = "Contact")]
    contact: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Opportunity")]
    opportunity: String,
    #[tabled(rename = "Last action")]
    last_action: String,
    #[tabled(rename = "When")]
    when: String,
}

impl From<&Arc<Lead>> for LeadRow {
    fn from(l: &Arc<Lead>) -> Self {
        Self {
            id: l.id.to_string(),
            company: l.company_name.clone(),
            contact: l.contact_name.clone(),
            status: l.status.to_string(),
            opportunity: l
                .opportunity
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            last_action: l.last_action.clone().unwrap_or_default(),
            when: l.last_action_date.clone().unwrap_or_default(),
        }
    }
}

fn detail(l: &Arc<Lead>) -> String {
    let mut lines = vec![
        format!("ID:           {}", l.id),
        format!("Company:      {}", l.company_name),
        format!("Contact:      {}", l.contact_name),
        format!("Status:       {}", l.status),
        format!(
            "Opportunity:  {}",
            l.opportunity.as_ref().map_or_else(|| "-".into(), ToString::to_string)
        ),
    ];
    if let Some(action) = &l.last_action {
        lines.push(format!(
            "Last action:  {action} ({})",
            l.last_action_date.as_deref().unwrap_or("-")
        ));
    }
    if let Some(campaign) = &l.campaign {
        lines.push(format!("Campaign:     {campaign}"));
    }
    if let Some(rec) = &l.ai_recommendation {
        lines.push(format!("Suggestion:   {rec}"));
    }
    if let Some(notes) = &l.notes {
        lines.push(format!("Notes:        {notes}"));
    }
    lines.join("\n")
}

pub(crate) fn render(global: &GlobalOpts, leads: &[Arc<Lead>]) -> Result<String, CliError> {
    output::render_list(global.output, leads, |l| LeadRow::from(l), |l| l.id.to_string())
}

pub(crate) fn filter_from(args: &LeadFilterArgs) -> LeadFilter {
    LeadFilter {
        only_assigned_to_me: args.mine,
        status: args.status,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: WorkspaceConfig,
    args: LeadsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        LeadsCommand::List(filter) => {
            let filter = filter_from(&filter);
            let leads = Workspace::oneshot(config, |ws| async move {
                let handle = ws.open_leads(filter).await?;
                util::check(handle.error())?;
                Ok(handle.leads())
            })
            .await?;

            output::print_output(&render(global, &leads)?, global.quiet);
            Ok(())
        }

        LeadsCommand::SetStatus { id, status } => {
            let lead = Workspace::oneshot(config, |ws| async move {
                let handle = ws.open_leads(LeadFilter::all()).await?;
                util::check(handle.error())?;
                let id = EntityId::from(id);
                if handle.lead(&id).is_none() {
                    return Err(util::not_found("lead", id.as_str()));
                }
                handle.set_lead_status(&id, status).await?;
                handle.settle().await;
                handle
                    .lead(&id)
                    .ok_or_else(|| util::not_found("lead", id.as_str()))
            })
            .await?;

            let out = output::render_single(global.output, &lead, detail, |l| l.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LeadsCommand::Log {
            id,
            action_type,
            description,
            meta,
        } => {
            let metadata = meta.as_deref().map(util::parse_meta).transpose()?;
            let outcome = Workspace::oneshot(config, |ws| async move {
                let handle = ws.open_leads(LeadFilter::all()).await?;
                Ok(handle
                    .log_lead_activity(&EntityId::from(id), &action_type, &description, metadata)
                    .await)
            })
            .await?;

            match outcome {
                AuditOutcome::Recorded => {
                    if !global.quiet {
                        eprintln!("Activity recorded");
                    }
                    Ok(())
                }
                AuditOutcome::Failed { reason } => Err(CliError::Backend {
                    message: reason,
                    code: None,
                }),
                AuditOutcome::Skipped => Err(CliError::Disconnected),
            }
        }
    }
}
