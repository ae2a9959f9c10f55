//! Async client for the chat-bot admin server.
//!
//! Two surfaces:
//!
//! - **[`DashboardClient`]** -- request/response JSON routes under `/api/`
//!   (bot control, status, configuration, daily stats, roster, recent logs).
//!   Envelope handling (`{success, error?, ...}`) is done once in the client,
//!   endpoint methods return unwrapped payloads.
//! - **[`push`]** -- the server-initiated event stream. The server speaks
//!   Socket.IO, so the channel runs Engine.IO/Socket.IO framing over a
//!   `tokio-tungstenite` WebSocket and fans parsed [`PushEvent`]s out through
//!   a broadcast channel, reconnecting with backoff on its own.

pub mod error;
pub mod models;
pub mod push;
pub mod rest;
pub mod transport;

pub use error::Error;
pub use models::{
    BotStatus, ConfigBundle, ConfigSaveRequest, LogEntry, Member, StatsSnapshot,
};
pub use push::{PushEvent, PushHandle, ReconnectConfig};
pub use rest::DashboardClient;
pub use transport::{TlsMode, TransportConfig};
