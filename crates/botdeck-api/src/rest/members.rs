// Roster endpoints
//
// Tracked chat participants, keyed by their account id (`qq`).

use tracing::debug;

use crate::error::Error;
use crate::models::Member;
use crate::rest::client::{DashboardClient, take_field};

impl DashboardClient {
    /// List all tracked members, active first, busiest first.
    ///
    /// `GET /api/members` -> `{success, members}`
    pub async fn list_members(&self) -> Result<Vec<Member>, Error> {
        let url = self.api_url("members")?;
        debug!("listing members");
        let mut envelope = self.get_envelope(url).await?;
        Ok(take_field::<Option<Vec<Member>>>(&mut envelope, "members")?.unwrap_or_default())
    }

    /// Replace the editable fields of one member.
    ///
    /// `PUT /api/members/{qq}` with the full member record
    pub async fn update_member(&self, member: &Member) -> Result<(), Error> {
        let encoded: String = url::form_urlencoded::byte_serialize(member.qq.as_bytes()).collect();
        let url = self.api_url(&format!("members/{encoded}"))?;
        debug!(qq = %member.qq, "updating member");
        self.put_envelope(url, member).await?;
        Ok(())
    }
}
