// ── DashboardState ──
//
// Owns the canonical in-memory copy of everything the console shows and
// applies updates from every source: poll results, push events, fetch
// completions, and user edits. Poll results carry the sequence number
// they were issued with; anything older than what is already applied is
// dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use botdeck_api::{
    BotStatus, ConfigBundle, ConfigSaveRequest, LogEntry, Member, PushEvent, StatsSnapshot,
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use super::log_buffer::BoundedLogBuffer;
use crate::config::DashboardConfig;
use crate::edit::{EditPhase, MemberEditSession};
use crate::env::EnvVars;
use crate::error::CoreError;
use crate::merge::BotConfig;
use crate::validate::{ValidationReport, validate};

/// The screen the operator is looking at. Stats are only polled on
/// [`View::Dashboard`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum View {
    #[default]
    Dashboard,
    Logs,
    Config,
    Members,
}

/// Push channel status as last reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StreamState {
    /// Push channel turned off in the configuration.
    Disabled,
    Connecting,
    Connected,
    Disconnected { reason: String },
}

/// Outcome of a sequenced apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// An update issued later has already been applied.
    Stale,
}

/// The aggregate. Owned by the controller's reconcile task alone.
#[derive(Debug)]
pub struct DashboardState {
    status: BotStatus,
    status_seq: u64,
    stats: StatsSnapshot,
    stats_seq: u64,
    template: BotConfig,
    config: BotConfig,
    env: EnvVars,
    config_loaded: bool,
    members: Vec<Member>,
    members_seq: u64,
    edit: MemberEditSession,
    logs: BoundedLogBuffer,
    stream: StreamState,
    view: View,
}

impl DashboardState {
    pub fn new(config: &DashboardConfig) -> Self {
        let template = BotConfig::template();
        Self {
            status: BotStatus::default(),
            status_seq: 0,
            stats: StatsSnapshot::default(),
            stats_seq: 0,
            config: template.clone(),
            template,
            env: EnvVars::default(),
            config_loaded: false,
            members: Vec::new(),
            members_seq: 0,
            edit: MemberEditSession::new(config.edit_policy),
            logs: BoundedLogBuffer::new(config.log_capacity, config.recent_capacity),
            stream: if config.push_enabled {
                StreamState::Connecting
            } else {
                StreamState::Disabled
            },
            view: View::default(),
        }
    }

    // ── Polled records ───────────────────────────────────────────────

    /// Replace the status record wholesale.
    pub fn apply_status(&mut self, seq: u64, status: BotStatus) -> Applied {
        if seq < self.status_seq {
            debug!(seq, newest = self.status_seq, "dropping stale status");
            return Applied::Stale;
        }
        self.status_seq = seq;
        self.status = status;
        Applied::Applied
    }

    /// Replace the daily counters wholesale.
    pub fn apply_stats(&mut self, seq: u64, stats: StatsSnapshot) -> Applied {
        if seq < self.stats_seq {
            debug!(seq, newest = self.stats_seq, "dropping stale stats");
            return Applied::Stale;
        }
        self.stats_seq = seq;
        self.stats = stats;
        Applied::Applied
    }

    pub fn status(&self) -> &BotStatus {
        &self.status
    }

    pub fn stats(&self) -> &StatsSnapshot {
        &self.stats
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Merge a fetched config over the default template and take the
    /// fetched env values. On a type mismatch nothing changes.
    pub fn apply_config(&mut self, bundle: ConfigBundle) -> Result<(), CoreError> {
        let merged = self.template.merged(&bundle.config)?;
        self.config = merged;
        self.env = EnvVars::from_plain(bundle.env);
        self.config_loaded = true;
        Ok(())
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Direct access for operator edits before a save.
    pub fn config_mut(&mut self) -> &mut BotConfig {
        &mut self.config
    }

    pub fn env(&self) -> &EnvVars {
        &self.env
    }

    pub fn set_env(&mut self, key: impl Into<String>, value: SecretString) {
        self.env.set(key, value);
    }

    pub fn validate(&self) -> ValidationReport {
        validate(&self.config, &self.env)
    }

    /// The body for the config save route: current config plus env.
    /// Refused until a server config has been merged in.
    pub fn config_payload(&self) -> Result<ConfigSaveRequest, CoreError> {
        if !self.config_loaded {
            return Err(CoreError::ConfigNotLoaded);
        }
        Ok(ConfigSaveRequest {
            config: self.config.as_value().clone(),
            env: self.env.expose(),
        })
    }

    // ── Roster ───────────────────────────────────────────────────────

    /// Replace the member list. Lists fetched before an already-applied
    /// one are dropped, so the reload that follows a save always wins.
    pub fn apply_member_list(&mut self, seq: u64, members: Vec<Member>) -> Applied {
        if seq < self.members_seq {
            debug!(seq, newest = self.members_seq, "dropping stale member list");
            return Applied::Stale;
        }
        self.members_seq = seq;
        self.members = members;
        Applied::Applied
    }

    /// The roster as displayed: server list with the open draft in place
    /// of its member.
    pub fn members(&self) -> Vec<Member> {
        let mut members = self.members.clone();
        self.edit.overlay(&mut members);
        members
    }

    pub fn edit(&self) -> &MemberEditSession {
        &self.edit
    }

    pub fn edit_mut(&mut self) -> &mut MemberEditSession {
        &mut self.edit
    }

    /// Open an edit on a member from the current list.
    pub fn start_edit(&mut self, qq: &str) -> Result<Option<Member>, CoreError> {
        let member = self
            .members
            .iter()
            .find(|m| m.qq == qq)
            .cloned()
            .ok_or_else(|| CoreError::MemberNotFound { qq: qq.into() })?;
        self.edit.start_edit(&member)
    }

    // ── Logs & push channel ──────────────────────────────────────────

    pub fn append_log(&mut self, entry: LogEntry) {
        self.logs.append(entry);
    }

    pub fn seed_logs(&mut self, batch: Vec<LogEntry>) {
        self.logs.seed(batch);
    }

    pub fn clear_logs(&mut self) {
        self.logs.clear();
    }

    pub fn logs(&self) -> &BoundedLogBuffer {
        &self.logs
    }

    /// Apply one push event. A disconnect only changes the stream
    /// indicator; it never touches the polled status.
    pub fn apply_push(&mut self, event: &PushEvent) {
        match event {
            PushEvent::Connected { message } => {
                debug!(message = message.as_deref().unwrap_or(""), "push channel greeting");
                self.stream = StreamState::Connected;
            }
            PushEvent::InitialLogs(batch) => {
                self.stream = StreamState::Connected;
                self.logs.seed(batch.iter().cloned());
            }
            PushEvent::Log(entry) => self.logs.append(entry.clone()),
            PushEvent::Disconnect { reason } => {
                self.stream = StreamState::Disconnected {
                    reason: reason.clone(),
                };
            }
        }
    }

    pub fn set_stream_state(&mut self, stream: StreamState) {
        self.stream = stream;
    }

    pub fn stream(&self) -> &StreamState {
        &self.stream
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    pub fn view(&self) -> View {
        self.view
    }

    // ── Read side ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            status: self.status.clone(),
            stats: self.stats.clone(),
            config: self.config.as_value().clone(),
            env: self.env.masked(),
            config_loaded: self.config_loaded,
            members: self.members(),
            edit: self.edit.draft().map(|draft| EditSnapshot {
                qq: draft.qq.clone(),
                phase: self.edit.phase(),
                dirty: self.edit.is_dirty(),
                draft: draft.clone(),
            }),
            logs: self.logs.all(),
            recent_logs: self.logs.recent(),
            stream: self.stream.clone(),
            view: self.view,
            taken_at: Utc::now(),
        }
    }
}

/// Read-only copy of the state handed to the view layer. Env values are
/// masked.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub status: BotStatus,
    pub stats: StatsSnapshot,
    pub config: serde_json::Value,
    pub env: BTreeMap<String, String>,
    pub config_loaded: bool,
    pub members: Vec<Member>,
    pub edit: Option<EditSnapshot>,
    pub logs: Vec<Arc<LogEntry>>,
    pub recent_logs: Vec<Arc<LogEntry>>,
    pub stream: StreamState,
    pub view: View,
    pub taken_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    /// Snapshot of a freshly created state, before anything was applied.
    pub fn initial(config: &DashboardConfig) -> Self {
        DashboardState::new(config).snapshot()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EditSnapshot {
    pub qq: String,
    pub phase: EditPhase,
    pub dirty: bool,
    pub draft: Member,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn state() -> DashboardState {
        let url = url::Url::parse("http://127.0.0.1:5000").unwrap();
        DashboardState::new(&DashboardConfig::new(url))
    }

    fn running(running: bool) -> BotStatus {
        BotStatus {
            running,
            ..BotStatus::default()
        }
    }

    fn member(qq: &str, nickname: &str) -> Member {
        let mut m = Member::new(qq);
        m.nickname = Some(nickname.into());
        m
    }

    #[test]
    fn later_poll_wins_over_disconnect_notice() {
        let mut s = state();
        assert_eq!(s.apply_status(1, running(false)), Applied::Applied);
        s.apply_push(&PushEvent::Disconnect {
            reason: "transport close".into(),
        });
        assert_eq!(s.apply_status(2, running(true)), Applied::Applied);

        assert!(s.status().running);
        assert!(matches!(s.stream(), StreamState::Disconnected { .. }));
    }

    #[test]
    fn stale_status_is_discarded() {
        let mut s = state();
        s.apply_status(5, running(true));
        assert_eq!(s.apply_status(4, running(false)), Applied::Stale);
        assert!(s.status().running);
    }

    #[test]
    fn stale_stats_are_discarded() {
        let mut s = state();
        let fresh = StatsSnapshot {
            messages_received: 10,
            ..StatsSnapshot::default()
        };
        s.apply_stats(2, fresh);
        assert_eq!(s.apply_stats(1, StatsSnapshot::default()), Applied::Stale);
        assert_eq!(s.stats().messages_received, 10);
    }

    #[test]
    fn config_is_merged_over_template() {
        let mut s = state();
        s.apply_config(ConfigBundle {
            config: json!({ "bot": { "qq_number": "10001" } }),
            env: [("DEEPSEEK_API_KEY".to_owned(), "sk-1".to_owned())]
                .into_iter()
                .collect(),
        })
        .unwrap();

        let payload = s.config_payload().unwrap();
        assert_eq!(payload.config["bot"]["qq_number"], "10001");
        assert_eq!(payload.config["features"]["mention_reply"], true);
        assert_eq!(payload.env["DEEPSEEK_API_KEY"], "sk-1");
        assert_eq!(payload.env["DASHSCOPE_API_KEY"], "");
    }

    #[test]
    fn payload_refused_before_config_is_loaded() {
        let mut s = state();
        s.config_mut()
            .set_path("bot.qq_number", json!("10001"))
            .unwrap();
        assert!(matches!(
            s.config_payload(),
            Err(CoreError::ConfigNotLoaded)
        ));
    }

    #[test]
    fn malformed_config_leaves_state_unchanged() {
        let mut s = state();
        s.config_mut()
            .set_path("bot.qq_number", json!("keep"))
            .unwrap();
        let err = s
            .apply_config(ConfigBundle {
                config: json!({ "ai": { "temperature": { "nested": 1 } } }),
                env: BTreeMap::new(),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
        assert_eq!(s.config().get_path("bot.qq_number"), Some(&json!("keep")));
        assert!(!s.snapshot().config_loaded);
    }

    #[test]
    fn draft_shadows_server_copy_until_session_ends() {
        let mut s = state();
        s.apply_member_list(1, vec![member("1", "before")]);
        s.start_edit("1").unwrap();
        s.edit_mut()
            .update(|m| m.nickname = Some("draft".into()))
            .unwrap();

        s.apply_member_list(2, vec![member("1", "server-update")]);
        assert_eq!(s.members()[0].nickname.as_deref(), Some("draft"));

        s.edit_mut().cancel();
        assert_eq!(s.members()[0].nickname.as_deref(), Some("server-update"));
    }

    #[test]
    fn start_edit_requires_known_member() {
        let mut s = state();
        assert!(matches!(
            s.start_edit("404"),
            Err(CoreError::MemberNotFound { .. })
        ));
    }

    #[test]
    fn stale_member_list_cannot_clobber_post_save_reload() {
        let mut s = state();
        s.apply_member_list(3, vec![member("1", "saved")]);
        assert_eq!(
            s.apply_member_list(2, vec![member("1", "pre-edit")]),
            Applied::Stale
        );
        assert_eq!(s.members()[0].nickname.as_deref(), Some("saved"));
    }

    #[test]
    fn push_events_drive_the_log_buffer() {
        let mut s = state();
        s.apply_push(&PushEvent::Log(LogEntry::new("1", "early")));
        s.apply_push(&PushEvent::InitialLogs(vec![
            LogEntry::new("0", "a"),
            LogEntry::new("1", "b"),
        ]));
        s.apply_push(&PushEvent::Log(LogEntry::new("2", "c")));

        let all: Vec<_> = s.logs().all().iter().map(|e| e.message.clone()).collect();
        assert_eq!(all, ["a", "b", "c"]);
        assert_eq!(s.stream(), &StreamState::Connected);
    }

    #[test]
    fn snapshot_masks_env() {
        let mut s = state();
        s.set_env(
            "DASHSCOPE_API_KEY",
            SecretString::from("ds-secret-value".to_owned()),
        );
        let snap = s.snapshot();
        assert_eq!(snap.env["DASHSCOPE_API_KEY"], "ds-********");
        let json = serde_json::to_string(&snap).unwrap();
        assert!(!json.contains("secret-value"));
    }

    #[test]
    fn view_parses_case_insensitively() {
        assert_eq!("Members".parse::<View>().unwrap(), View::Members);
        assert_eq!(View::Logs.to_string(), "logs");
    }
}
