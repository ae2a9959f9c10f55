// Activity endpoints
//
// Daily counters and the server-side log backlog.

use tracing::debug;

use crate::error::Error;
use crate::models::{LogEntry, StatsSnapshot};
use crate::rest::client::{DashboardClient, take_field};

impl DashboardClient {
    /// Counters for the current day.
    ///
    /// `GET /api/stats/today` -> `{success, data}`
    pub async fn today_stats(&self) -> Result<StatsSnapshot, Error> {
        let url = self.api_url("stats/today")?;
        debug!("fetching today's stats");
        let mut envelope = self.get_envelope(url).await?;
        take_field(&mut envelope, "data")
    }

    /// The most recent `count` lines the server has buffered.
    ///
    /// `GET /api/logs/recent?count={count}` -> `{success, logs}`
    pub async fn recent_logs(&self, count: usize) -> Result<Vec<LogEntry>, Error> {
        let mut url = self.api_url("logs/recent")?;
        url.query_pairs_mut()
            .append_pair("count", &count.to_string());
        debug!(count, "fetching recent logs");
        let mut envelope = self.get_envelope(url).await?;
        Ok(take_field::<Option<Vec<LogEntry>>>(&mut envelope, "logs")?.unwrap_or_default())
    }
}
