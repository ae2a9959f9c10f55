// ── Core error types ──
//
// User-facing errors from botdeck-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<botdeck_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach admin server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Admin server request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Server responses ─────────────────────────────────────────────
    /// `success: false`; the message is the server's, verbatim.
    #[error("{message}")]
    Rejected { message: String },

    #[error("Admin server error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api { message: String, status: Option<u16> },

    // ── Configuration data ───────────────────────────────────────────
    #[error("Type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid config path `{path}`")]
    InvalidPath { path: String },

    #[error("Configuration is invalid: {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    /// Saving now would overwrite the server copy with the defaults.
    #[error("The server configuration has not been loaded yet; refresh before saving")]
    ConfigNotLoaded,

    // ── Edit session ─────────────────────────────────────────────────
    #[error("Member {qq} has unsaved changes; save or cancel first")]
    EditConflict { qq: String },

    #[error("No member is being edited")]
    NoActiveEdit,

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("Member not found: {qq}")]
    MemberNotFound { qq: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Dashboard is not running")]
    NotRunning,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<botdeck_api::Error> for CoreError {
    fn from(err: botdeck_api::Error) -> Self {
        use botdeck_api::Error as Api;

        match err {
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::Status { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            Api::Api { message } => CoreError::Rejected { message },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Unexpected response shape: {message}"))
            }
            Api::PushConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("push channel: {reason}"),
            },
            Api::PushClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("push channel closed (code {code}): {reason}"),
            },
            Api::Protocol(msg) => CoreError::Internal(format!("push protocol: {msg}")),
        }
    }
}
