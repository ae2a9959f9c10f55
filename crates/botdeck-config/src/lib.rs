//! Shared configuration for the botdeck CLI.
//!
//! TOML profiles (one per admin server), figment layering of defaults,
//! file, and `BOTDECK_` environment variables, and translation of a
//! profile into `botdeck_core::DashboardConfig`. The CLI adds
//! flag-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use botdeck_core::{DashboardConfig, EditPolicy, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named admin server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look a profile up by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.profile_names(),
            })
    }

    /// Sorted profile names.
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}

/// One admin server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Admin server root (e.g., "http://127.0.0.1:5000").
    pub url: String,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,

    /// Status poll period in milliseconds.
    pub poll_interval_ms: Option<u64>,

    /// Subscribe to the push channel for live logs.
    pub push: Option<bool>,

    pub log_capacity: Option<usize>,

    pub recent_capacity: Option<usize>,

    /// Cap on the push reconnect backoff, in seconds.
    pub reconnect_max_delay: Option<u64>,

    /// "discard_unsaved" or "reject_dirty".
    pub edit_policy: Option<EditPolicy>,
}

impl Profile {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "botdeck", "botdeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("botdeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BOTDECK_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `DashboardConfig` from a profile. Unset fields keep the
/// runtime defaults; `defaults` supplies timeout and TLS leniency.
pub fn profile_to_dashboard_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<DashboardConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let mut config = DashboardConfig::new(url);

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    if let Some(ms) = profile.poll_interval_ms {
        if ms == 0 {
            return Err(ConfigError::Validation {
                field: "poll_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        config.poll_interval = Duration::from_millis(ms);
    }
    if let Some(push) = profile.push {
        config.push_enabled = push;
    }
    if let Some(n) = profile.log_capacity {
        config.log_capacity = n;
    }
    if let Some(n) = profile.recent_capacity {
        config.recent_capacity = n;
    }
    if let Some(secs) = profile.reconnect_max_delay {
        config.reconnect.max_delay = Duration::from_secs(secs);
    }
    if let Some(policy) = profile.edit_policy {
        config.edit_policy = policy;
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
        assert_eq!(cfg.defaults.output, "table");
    }

    #[test]
    fn save_then_load_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        let mut home = Profile::new("http://127.0.0.1:5000");
        home.push = Some(false);
        home.edit_policy = Some(EditPolicy::RejectDirty);
        cfg.profiles.insert("home".into(), home.clone());
        cfg.default_profile = Some("home".into());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.default_profile.as_deref(), Some("home"));
        assert_eq!(loaded.profile("home").unwrap(), &home);
    }

    #[test]
    fn unknown_profile_lists_available() {
        let mut cfg = Config::default();
        cfg.profiles.insert("b".into(), Profile::new("http://b"));
        cfg.profiles.insert("a".into(), Profile::new("http://a"));

        let err = cfg.profile("c").unwrap_err();
        let ConfigError::ProfileNotFound { available, .. } = err else {
            panic!("expected ProfileNotFound");
        };
        assert_eq!(available, ["a", "b"]);
    }

    #[test]
    fn profile_overrides_runtime_defaults() {
        let mut profile = Profile::new("https://bot.example.com");
        profile.poll_interval_ms = Some(5000);
        profile.push = Some(false);
        profile.log_capacity = Some(200);
        profile.reconnect_max_delay = Some(10);
        profile.timeout = Some(3);

        let cfg = profile_to_dashboard_config(&profile, &Defaults::default()).unwrap();
        assert_eq!(cfg.url.as_str(), "https://bot.example.com/");
        assert_eq!(cfg.poll_interval, Duration::from_millis(5000));
        assert!(!cfg.push_enabled);
        assert_eq!(cfg.log_capacity, 200);
        assert_eq!(cfg.recent_capacity, 100);
        assert_eq!(cfg.reconnect.max_delay, Duration::from_secs(10));
        assert_eq!(cfg.timeout, Duration::from_secs(3));
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn insecure_wins_over_ca_cert() {
        let mut profile = Profile::new("https://bot.example.com");
        profile.ca_cert = Some("/etc/ca.pem".into());
        let cfg = profile_to_dashboard_config(&profile, &Defaults::default()).unwrap();
        assert_eq!(cfg.tls, TlsVerification::CustomCa("/etc/ca.pem".into()));

        profile.insecure = Some(true);
        let cfg = profile_to_dashboard_config(&profile, &Defaults::default()).unwrap();
        assert_eq!(cfg.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn rejects_bad_url_and_zero_interval() {
        let err = profile_to_dashboard_config(&Profile::new("not a url"), &Defaults::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "url"));

        let mut profile = Profile::new("http://127.0.0.1:5000");
        profile.poll_interval_ms = Some(0);
        let err = profile_to_dashboard_config(&profile, &Defaults::default()).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "poll_interval_ms")
        );
    }
}
