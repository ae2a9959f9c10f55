// Configuration endpoints
//
// The bot's nested YAML configuration (served as JSON) and its `.env`
// secrets travel together in one GET/POST pair.

use tracing::debug;

use crate::error::Error;
use crate::models::{ConfigBundle, ConfigSaveRequest};
use crate::rest::client::{DashboardClient, take_field};

impl DashboardClient {
    /// Fetch the bot configuration and environment values.
    ///
    /// `GET /api/config` -> `{success, config, env}`
    pub async fn get_config(&self) -> Result<ConfigBundle, Error> {
        let url = self.api_url("config")?;
        debug!("fetching bot configuration");
        let mut envelope = self.get_envelope(url).await?;
        Ok(ConfigBundle {
            config: take_field(&mut envelope, "config")?,
            env: take_field::<Option<_>>(&mut envelope, "env")?.unwrap_or_default(),
        })
    }

    /// Persist configuration and environment values.
    ///
    /// `POST /api/config` with `{config, env}`
    pub async fn save_config(&self, request: &ConfigSaveRequest) -> Result<(), Error> {
        let url = self.api_url("config")?;
        debug!(env_keys = request.env.len(), "saving bot configuration");
        self.post_envelope(url, Some(request)).await?;
        Ok(())
    }
}
