// Bot process endpoints
//
// Start/stop/restart of the bot process and its live status.

use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::models::BotStatus;
use crate::rest::client::DashboardClient;

impl DashboardClient {
    /// Start the bot process.
    ///
    /// `POST /api/bot/start`
    pub async fn start_bot(&self) -> Result<(), Error> {
        debug!("starting bot");
        self.bot_action("start").await
    }

    /// Stop the bot process.
    ///
    /// `POST /api/bot/stop`
    pub async fn stop_bot(&self) -> Result<(), Error> {
        debug!("stopping bot");
        self.bot_action("stop").await
    }

    /// Restart the bot process. The server stops, waits, then starts.
    ///
    /// `POST /api/bot/restart`
    pub async fn restart_bot(&self) -> Result<(), Error> {
        debug!("restarting bot");
        self.bot_action("restart").await
    }

    /// Current process status.
    ///
    /// `GET /api/bot/status` -- a bare record, no envelope.
    pub async fn bot_status(&self) -> Result<BotStatus, Error> {
        let url = self.api_url("bot/status")?;
        self.get_plain(url).await
    }

    async fn bot_action(&self, action: &str) -> Result<(), Error> {
        let url = self.api_url(&format!("bot/{action}"))?;
        self.post_envelope(url, None::<&Value>).await?;
        Ok(())
    }
}
