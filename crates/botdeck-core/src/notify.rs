// ── Operator notifications ──
//
// Fire-and-forget messages about the outcome of operator actions. They
// are not part of the reconciled state: the view decides how to show and
// expire them using `ttl`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    #[serde(with = "ttl_millis")]
    pub ttl: Duration,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            level,
            message: message.into(),
            ttl,
            created_at: Utc::now(),
        }
    }

    /// Whether the display window has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => now >= self.created_at + ttl,
            Err(_) => true,
        }
    }
}

mod ttl_millis {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(ttl: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u64(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_ttl() {
        let n = Notification::new(NotificationLevel::Success, "saved", Duration::from_secs(3));
        assert!(!n.is_expired(n.created_at));
        assert!(n.is_expired(n.created_at + chrono::Duration::seconds(3)));
    }

    #[test]
    fn serializes_ttl_as_millis() {
        let n = Notification::new(NotificationLevel::Error, "boom", Duration::from_secs(3));
        let json = serde_json::to_value(&n).unwrap_or_default();
        assert_eq!(json["ttl"], 3000);
        assert_eq!(json["level"], "error");
    }
}
