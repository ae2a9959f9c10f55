//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use botdeck_config::ConfigError;
use botdeck_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const REJECTED: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const INVALID_CONFIG: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the admin server at {url}: {reason}")]
    #[diagnostic(
        code(botdeck::connection_failed),
        help(
            "Check that the admin server is running and reachable.\n\
             Try: botdeck status --url http://127.0.0.1:5000"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(botdeck::timeout),
        help("Increase the timeout with --timeout or check the server's responsiveness.")
    )]
    Timeout,

    // ── Server responses ─────────────────────────────────────────────
    /// The server refused the request; `message` is its own wording.
    #[error("{message}")]
    #[diagnostic(code(botdeck::rejected))]
    Rejected { message: String },

    #[error("Admin server error: {message}")]
    #[diagnostic(code(botdeck::api_error))]
    ApiError { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(botdeck::not_found),
        help("Run: botdeck {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' has unsaved changes")]
    #[diagnostic(code(botdeck::conflict))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(botdeck::validation))]
    Validation { field: String, reason: String },

    #[error("The bot configuration is invalid")]
    #[diagnostic(
        code(botdeck::invalid_config),
        help("{details}\nFix the values above, or pass --force to save anyway.")
    )]
    InvalidBotConfig { details: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(botdeck::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: botdeck profile add <name> --url <url>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No admin server configured")]
    #[diagnostic(
        code(botdeck::no_config),
        help(
            "Pass --url, set BOTDECK_URL, or create a profile with:\n\
             botdeck profile add default --url http://127.0.0.1:5000\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(botdeck::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(botdeck::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::InvalidBotConfig { .. } => exit_code::INVALID_CONFIG,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError ───────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name, available } => CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError ─────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::Timeout { .. } => CliError::Timeout,

            CoreError::Rejected { message } => CliError::Rejected { message },

            err @ (CoreError::Api { .. } | CoreError::ConfigNotLoaded) => CliError::ApiError {
                message: err.to_string(),
            },

            err @ (CoreError::TypeMismatch { .. } | CoreError::InvalidPath { .. }) => {
                CliError::Validation {
                    field: "path".into(),
                    reason: err.to_string(),
                }
            }

            CoreError::ValidationFailed { errors } => CliError::InvalidBotConfig {
                details: bullet_list(&errors),
            },

            CoreError::EditConflict { qq } => CliError::Conflict {
                resource_type: "member".into(),
                identifier: qq,
            },

            CoreError::MemberNotFound { qq } => CliError::NotFound {
                resource_type: "member".into(),
                identifier: qq,
                list_command: "members list".into(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            err @ (CoreError::NoActiveEdit
            | CoreError::SaveInProgress
            | CoreError::NotRunning
            | CoreError::Internal(_)) => CliError::Internal(err.to_string()),
        }
    }
}

/// One "  - item" line per entry.
pub fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
