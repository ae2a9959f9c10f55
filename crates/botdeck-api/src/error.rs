use thiserror::Error;

/// Top-level error type for the `botdeck-api` crate.
///
/// Covers every failure mode of both surfaces: HTTP transport, the
/// `{success, error}` envelope, payload decoding, and the push channel.
/// `botdeck-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-2xx HTTP status from the admin server.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    // ── Application ─────────────────────────────────────────────────
    /// `{"success": false, "error": "..."}` from the admin server.
    #[error("{message}")]
    Api { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Push channel ────────────────────────────────────────────────
    /// WebSocket connection for the push channel failed.
    #[error("Push channel connection failed: {0}")]
    PushConnect(String),

    /// Push channel closed by the peer.
    #[error("Push channel closed (code {code}): {reason}")]
    PushClosed { code: u16, reason: String },

    /// A frame on the push channel did not follow Engine.IO/Socket.IO framing.
    #[error("Push protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::PushConnect(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Status { status: 404, .. } => true,
            _ => false,
        }
    }

    /// The server-supplied message for application-level failures.
    pub fn api_message(&self) -> Option<&str> {
        match self {
            Self::Api { message } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Status {
            status: 502,
            message: "bad gateway".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }

    #[test]
    fn api_errors_keep_the_server_message_verbatim() {
        let err = Error::Api {
            message: "Bot已在运行".into(),
        };
        assert_eq!(err.to_string(), "Bot已在运行");
        assert_eq!(err.api_message(), Some("Bot已在运行"));
        assert!(!err.is_transient());
    }
}
