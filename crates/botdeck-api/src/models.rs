// Admin server wire types
//
// Models for the JSON bodies of the `/api/` routes and the push channel.
// Fields use `#[serde(default)]` liberally: the server omits most status
// fields while the bot is stopped, and the roster comes straight out of
// SQLite rows. Unknown fields are kept in `extra` so nothing the server
// sends is silently dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ── Bot status ───────────────────────────────────────────────────────

/// Process status from `GET /api/bot/status` (no envelope).
///
/// A stopped bot is reported as just `{"running": false}`; the remaining
/// fields fall back to the placeholders the dashboard shows before the
/// first poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default = "placeholder_uptime")]
    pub uptime: String,
    #[serde(default)]
    pub memory_mb: f64,
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

fn placeholder_uptime() -> String {
    "-".into()
}

impl Default for BotStatus {
    fn default() -> Self {
        Self {
            running: false,
            uptime: placeholder_uptime(),
            memory_mb: 0.0,
            cpu_percent: 0.0,
            pid: None,
        }
    }
}

// ── Daily stats ──────────────────────────────────────────────────────

/// Counters for the current day, the `data` field of `GET /api/stats/today`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub messages_received: u64,
    #[serde(default)]
    pub replies_sent: u64,
    #[serde(default)]
    pub proactive_messages: u64,
    /// Replies per received message, as computed by the server.
    #[serde(default)]
    pub trigger_rate: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Logs ─────────────────────────────────────────────────────────────

/// One line of bot output.
///
/// The server stamps lines with a wall-clock `HH:MM:SS` timestamp and
/// does not always send a level, so `level` is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogEntry {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            level: None,
            message: message.into(),
            extra: Map::new(),
        }
    }
}

// ── Roster ───────────────────────────────────────────────────────────

/// A tracked chat participant from `GET /api/members`.
///
/// `qq` is the identity key. `message_count` and `last_active` are
/// maintained by the bot and passed through untouched on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub qq: String,
    #[serde(default)]
    pub qq_name: Option<String>,
    #[serde(default)]
    pub group_card: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_active", deserialize_with = "bool_from_int_or_bool")]
    pub is_active: bool,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub last_active: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Member {
    /// A bare roster entry with only the identity key set.
    pub fn new(qq: impl Into<String>) -> Self {
        Self {
            qq: qq.into(),
            qq_name: None,
            group_card: None,
            nickname: None,
            birthday: None,
            notes: None,
            avatar_url: None,
            is_active: true,
            message_count: 0,
            last_active: None,
            extra: Map::new(),
        }
    }

    /// Best display name: nickname, then group card, then account name.
    pub fn display_name(&self) -> &str {
        [&self.nickname, &self.group_card, &self.qq_name]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .find(|v| !v.is_empty())
            .unwrap_or(&self.qq)
    }
}

fn default_active() -> bool {
    true
}

/// SQLite hands ids back as integers or text depending on how the row
/// was written.
fn id_from_string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// `is_active` is an INTEGER column; accept `0/1`, booleans, and null.
fn bool_from_int_or_bool<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    match Value::deserialize(de)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().is_some_and(|v| v != 0)),
        Value::Null => Ok(default_active()),
        other => Err(serde::de::Error::custom(format!(
            "expected boolean or integer flag, got {other}"
        ))),
    }
}

// ── Configuration ────────────────────────────────────────────────────

/// Payload of `GET /api/config`: the bot's YAML config as JSON plus the
/// `.env` key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigBundle {
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Body of `POST /api/config`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSaveRequest {
    pub config: Value,
    pub env: BTreeMap<String, String>,
}

// ── Tests ────────────────────────────────────────────────────────────
