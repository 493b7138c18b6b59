//! `watch`: keep a handle open and re-render on every realtime change.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};

use leadhunter_core::{CoreError, EntityStream, Notification, Workspace, WorkspaceConfig};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::{campaigns, leads, util};

pub async fn handle(
    config: WorkspaceConfig,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !config.realtime_enabled {
        return Err(CliError::Validation {
            field: "realtime".into(),
            reason: "realtime is disabled for this profile".into(),
        });
    }

    let workspace = Workspace::connect(config).await?;
    let result = run(&workspace, args, global).await;
    workspace.shutdown().await;
    result
}

async fn run(workspace: &Workspace, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut notes = workspace.notifications();

    if args.campaigns {
        let handle = workspace.open_campaigns().await?;
        ensure_live(handle.error(), handle.is_watching().await)?;
        follow(handle.subscribe(), &mut notes, global, |c| {
            campaigns::render(global, c)
        })
        .await
    } else {
        let handle = workspace.open_leads(leads::filter_from(&args.filter)).await?;
        ensure_live(handle.error(), handle.is_watching().await)?;
        follow(handle.subscribe(), &mut notes, global, |l| leads::render(global, l)).await
    }
}

fn ensure_live(error: Option<CoreError>, watching: bool) -> Result<(), CliError> {
    util::check(error)?;
    if watching {
        Ok(())
    } else {
        Err(CliError::Backend {
            message: "realtime change feed could not be opened".into(),
            code: None,
        })
    }
}

/// Print the current snapshot, then every new one until Ctrl-C or the
/// handle closes. Notifications go to stderr.
async fn follow<T, F>(
    mut stream: EntityStream<T>,
    notes: &mut broadcast::Receiver<Notification>,
    global: &GlobalOpts,
    render: F,
) -> Result<(), CliError>
where
    T: Send + Sync + 'static,
    F: Fn(&[Arc<T>]) -> Result<String, CliError>,
{
    let color = output::should_color(global.color);
    let mut notes_open = true;

    output::print_output(&render(stream.current().as_slice())?, global.quiet);

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::debug!("interrupted, stopping watch");
                break;
            }
            snapshot = stream.changed() => match snapshot {
                Some(snapshot) => output::print_output(&render(snapshot.as_slice())?, global.quiet),
                None => break,
            },
            note = notes.recv(), if notes_open => match note {
                Ok(note) => eprintln!("{}", output::format_notification(&note, color)),
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "notification receiver lagged"),
                Err(RecvError::Closed) => notes_open = false,
            },
        }
    }
    Ok(())
}
