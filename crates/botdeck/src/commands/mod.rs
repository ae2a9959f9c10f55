//! Command dispatch: bridges CLI args -> dashboard calls -> output formatting.

pub mod bot;
pub mod config_cmd;
pub mod logs;
pub mod members;
pub mod profile;
pub mod status;
pub mod util;
pub mod watch;

use botdeck_core::DashboardConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: DashboardConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle_status(config, global).await,
        Command::Stats => status::handle_stats(config, global).await,
        Command::Bot(args) => bot::handle(config, args, global).await,
        Command::Config(args) => config_cmd::handle(config, args, global).await,
        Command::Members(args) => members::handle(config, args, global).await,
        Command::Logs(args) => logs::handle(config, args, global).await,
        Command::Watch => watch::handle(config, global).await,
        // Profile and Completions are handled before dispatch
        Command::Profile(_) | Command::Completions(_) => Err(CliError::Internal(
            "local command routed to server dispatch".into(),
        )),
    }
}
