//! Command dispatch: bridges CLI args -> workspace handles -> output formatting.

pub mod campaigns;
pub mod leads;
pub mod util;
pub mod watch;

use leadhunter_core::WorkspaceConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: WorkspaceConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Leads(args) => leads::handle(config, args, global).await,
        Command::Campaigns(args) => campaigns::handle(config, args, global).await,
        Command::Watch(args) => watch::handle(config, &args, global).await,
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}
