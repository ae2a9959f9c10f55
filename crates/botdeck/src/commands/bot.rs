//! Bot process control handlers.

use botdeck_core::DashboardConfig;

use crate::cli::{BotArgs, BotCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::Painter;

use super::util;

pub async fn handle(
    config: DashboardConfig,
    args: BotArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let dashboard = util::dashboard(config)?;

    let done = match args.command {
        BotCommand::Start => {
            dashboard.start_bot().await?;
            "Bot started"
        }
        BotCommand::Stop => {
            if !util::confirm("Stop the bot?", "bot stop", global.yes)? {
                return Ok(());
            }
            dashboard.stop_bot().await?;
            "Bot stopped"
        }
        BotCommand::Restart => {
            if !util::confirm("Restart the bot?", "bot restart", global.yes)? {
                return Ok(());
            }
            dashboard.restart_bot().await?;
            "Bot restarted"
        }
    };

    if !global.quiet {
        eprintln!("{} {done}", Painter::new(global.color).good("✓"));
    }
    Ok(())
}
