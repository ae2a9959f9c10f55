// ── Runtime dashboard configuration ──
//
// How to reach the admin server and how the reconciliation loop behaves.
// Never touches disk: the CLI builds a `DashboardConfig` (usually from a
// botdeck-config profile) and hands it in.

use std::time::Duration;

use botdeck_api::ReconnectConfig;
use url::Url;

use crate::edit::EditPolicy;
use crate::store::{DEFAULT_FULL_CAPACITY, DEFAULT_RECENT_CAPACITY};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed reverse proxies).
    DangerAcceptInvalid,
}

/// Configuration for one admin server.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Admin server root (e.g., `http://127.0.0.1:5000`).
    pub url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Status (and, on the dashboard view, stats) poll period.
    pub poll_interval: Duration,
    /// Long log window size.
    pub log_capacity: usize,
    /// Short log window size.
    pub recent_capacity: usize,
    /// Subscribe to the server push channel. When off, logs are seeded
    /// once from the recent-logs route.
    pub push_enabled: bool,
    pub reconnect: ReconnectConfig,
    pub edit_policy: EditPolicy,
    /// How long a notification should stay on screen.
    pub notification_ttl: Duration,
}

impl DashboardConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
    pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(3);

    /// Defaults for everything but the server address.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            log_capacity: DEFAULT_FULL_CAPACITY,
            recent_capacity: DEFAULT_RECENT_CAPACITY,
            push_enabled: true,
            reconnect: ReconnectConfig::default(),
            edit_policy: EditPolicy::default(),
            notification_ttl: Self::DEFAULT_NOTIFICATION_TTL,
        }
    }
}
