//! Campaign command handlers.

use std::sync::Arc;

use tabled::Tabled;

use leadhunter_core::{Campaign, CampaignDraft, CampaignUpdate, EntityId, Workspace, WorkspaceConfig};

use crate::cli::{CampaignFields, CampaignsArgs, CampaignsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct CampaignRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Leads")]
    leads: u32,
    #[tabled(rename = "Responses")]
    responses: u32,
    #[tabled(rename = "Meetings")]
    meetings: u32,
    #[tabled(rename = "Conv %")]
    conversion: String,
    #[tabled(rename = "Days left")]
    remaining: u32,
}

impl From<&Arc<Campaign>> for CampaignRow {
    fn from(c: &Arc<Campaign>) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.name.clone(),
            status: c.status.to_string(),
            progress: format!("{}%", c.progress),
            leads: c.total_leads,
            responses: c.responses,
            meetings: c.meetings,
            conversion: format!("{:.1}", c.conversion_rate),
            remaining: c.remaining_days,
        }
    }
}

fn detail(c: &Campaign) -> String {
    let mut lines = vec![
        format!("ID:           {}", c.id),
        format!("Name:         {}", c.name),
        format!("Status:       {}", c.status),
        format!("Objective:    {}", c.objective),
        format!("Lead source:  {}", c.lead_source),
        format!("Progress:     {}%", c.progress),
        format!("Leads:        {}", c.total_leads),
        format!("Responses:    {}", c.responses),
        format!("Meetings:     {}", c.meetings),
        format!("Conversion:   {:.1}%", c.conversion_rate),
        format!("Days left:    {}", c.remaining_days),
    ];
    if let Some(created) = c.created_at {
        lines.push(format!("Created:      {}", created.format("%Y-%m-%d %H:%M UTC")));
    }
    lines.join("\n")
}

pub(crate) fn render(global: &GlobalOpts, campaigns: &[Arc<Campaign>]) -> Result<String, CliError> {
    output::render_list(global.output, campaigns, |c| CampaignRow::from(c), |c| c.id.to_string())
}

// ── Field mapping ───────────────────────────────────────────────────

fn to_draft(f: CampaignFields) -> CampaignDraft {
    CampaignDraft {
        name: f.name,
        status: f.status,
        objective: f.objective,
        progress: f.progress,
        total_leads: f.total_leads,
        lead_source: f.source,
        responses: f.responses,
        meetings: f.meetings,
        conversion_rate: f.conversion_rate,
        remaining_days: f.remaining_days,
    }
}

fn to_update(f: CampaignFields) -> CampaignUpdate {
    CampaignUpdate {
        name: f.name,
        status: f.status,
        objective: f.objective,
        progress: f.progress,
        total_leads: f.total_leads,
        lead_source: f.source,
        responses: f.responses,
        meetings: f.meetings,
        conversion_rate: f.conversion_rate,
        remaining_days: f.remaining_days,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: WorkspaceConfig,
    args: CampaignsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        CampaignsCommand::List { active } => {
            let campaigns = Workspace::oneshot(config, |ws| async move {
                let handle = ws.open_campaigns().await?;
                util::check(handle.error())?;
                Ok(if active {
                    handle.active_campaigns()
                } else {
                    handle.campaigns().as_ref().clone()
                })
            })
            .await?;

            output::print_output(&render(global, &campaigns)?, global.quiet);
            Ok(())
        }

        CampaignsCommand::Create(fields) => {
            let draft = to_draft(fields);
            draft.validate()?;
            let created = Workspace::oneshot(config, |ws| async move {
                let handle = ws.open_campaigns().await?;
                handle.create_campaign(draft).await
            })
            .await?;

            let out = output::render_single(global.output, &created, detail, |c| c.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CampaignsCommand::Update { id, fields } => {
            let update = to_update(fields);
            if update.is_empty() {
                return Err(CliError::Validation {
                    field: "fields".into(),
                    reason: "nothing to update; pass at least one field flag".into(),
                });
            }
            update.validate()?;

            let updated = Workspace::oneshot(config, |ws| async move {
                let handle = ws.open_campaigns().await?;
                util::check(handle.error())?;
                let id = EntityId::from(id);
                if handle.campaign(&id).is_none() {
                    return Err(util::not_found("campaign", id.as_str()));
                }
                if !handle.update_campaign(&id, update).await {
                    return Err(util::failure(handle.error(), "campaign update"));
                }
                handle
                    .campaign(&id)
                    .ok_or_else(|| util::not_found("campaign", id.as_str()))
            })
            .await?;

            let out = output::render_single(
                global.output,
                updated.as_ref(),
                detail,
                |c| c.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CampaignsCommand::Delete { id } => {
            if !util::confirm(
                &format!("Delete campaign {id}?"),
                "campaigns delete",
                global.yes,
            )? {
                return Ok(());
            }

            Workspace::oneshot(config, |ws| async move {
                let handle = ws.open_campaigns().await?;
                util::check(handle.error())?;
                let id = EntityId::from(id);
                if handle.campaign(&id).is_none() {
                    return Err(util::not_found("campaign", id.as_str()));
                }
                if !handle.delete_campaign(&id).await {
                    return Err(util::failure(handle.error(), "campaign delete"));
                }
                Ok(())
            })
            .await?;

            if !global.quiet {
                eprintln!("Campaign deleted");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadhunter_core::CampaignStatus;

    #[test]
    fn fields_map_onto_update() {
        let fields = CampaignFields {
            source: Some("LinkedIn".into()),
            status: Some(CampaignStatus::Paused),
            ..CampaignFields::default()
        };
        let update = to_update(fields);
        assert_eq!(update.lead_source.as_deref(), Some("LinkedIn"));
        assert_eq!(update.status, Some(CampaignStatus::Paused));
        assert!(update.name.is_none());
        assert!(!update.is_empty());
    }

    #[test]
    fn empty_fields_make_an_empty_update() {
        assert!(to_update(CampaignFields::default()).is_empty());
    }
}
