//! Server push channel with auto-reconnect.
//!
//! Connects to the admin server's Socket.IO endpoint over a WebSocket,
//! decodes Engine.IO/Socket.IO framing (see [`codec`]) and streams parsed
//! [`PushEvent`]s through a [`tokio::sync::broadcast`] channel. Handles the
//! Engine.IO heartbeat and reconnects with exponential backoff + jitter.
//!
//! A reconnect is a fresh session: the server resends `initial_logs` on
//! every connect, so no resume or gap-filling is attempted.
//!
//! # Example
//!
//! ```rust,ignore
//! use botdeck_api::{DashboardClient, PushEvent, PushHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let handle = PushHandle::connect(client.push_url()?, ReconnectConfig::default(), cancel);
//! let mut rx = handle.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     if let PushEvent::Log(entry) = event.as_ref() {
//!         println!("[{}] {}", entry.timestamp, entry.message);
//!     }
//! }
//!
//! handle.shutdown();
//! ```

pub mod codec;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::LogEntry;
use codec::{EnginePacket, SocketPacket};

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Liveness window used until the server's handshake announces its own
/// heartbeat settings (Engine.IO defaults: 25 s interval + 20 s timeout).
const DEFAULT_LIVENESS: Duration = Duration::from_secs(45);

// ── PushEvent ────────────────────────────────────────────────────────

/// An event delivered by the push channel, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Server greeting after the namespace join. Informational.
    Connected { message: Option<String> },
    /// History snapshot sent on every (re)connect; replaces the log buffer.
    InitialLogs(Vec<LogEntry>),
    /// One live log line; appended.
    Log(LogEntry),
    /// The connection was lost. The channel is already reconnecting.
    Disconnect { reason: String },
}

#[derive(Deserialize)]
struct ConnectedPayload {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct InitialLogsPayload {
    #[serde(default)]
    logs: Vec<LogEntry>,
}

impl PushEvent {
    /// Map a Socket.IO event to a push event.
    ///
    /// Returns `Ok(None)` for event names this client does not consume and
    /// an error when a known event carries a malformed payload.
    pub fn from_socket_event(name: &str, payload: Value) -> Result<Option<Self>, Error> {
        let decode_err = |e: serde_json::Error| Error::Deserialization {
            message: format!("`{name}` event: {e}"),
            body: String::new(),
        };
        let event = match name {
            "connected" => {
                let payload = if payload.is_null() {
                    ConnectedPayload { message: None }
                } else {
                    serde_json::from_value::<ConnectedPayload>(payload).map_err(decode_err)?
                };
                Self::Connected {
                    message: payload.message,
                }
            }
            "initial_logs" => Self::InitialLogs(
                serde_json::from_value::<InitialLogsPayload>(payload)
                    .map_err(decode_err)?
                    .logs,
            ),
            "log" => Self::Log(serde_json::from_value(payload).map_err(decode_err)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for push channel reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failed connection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── PushHandle ───────────────────────────────────────────────────────

/// Handle to a running push channel.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`connect`](Self::connect)) to tear down the background task.
pub struct PushHandle {
    event_rx: broadcast::Receiver<Arc<PushEvent>>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl PushHandle {
    /// Spawn the connection loop and return immediately.
    ///
    /// The first connection attempt happens asynchronously; subscribe
    /// before awaiting anything to see the initial `connected` and
    /// `initial_logs` events.
    pub fn connect(push_url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            push_loop(push_url, event_tx, reconnect, task_cancel).await;
        });

        Self {
            event_rx,
            cancel,
            task,
        }
    }

    /// Get a new broadcast receiver for the event stream.
    ///
    /// If a consumer falls behind, it receives
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PushEvent>> {
        self.event_rx.resubscribe()
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Shut down and wait for the background task to exit.
    pub async fn join(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "push channel task panicked");
        }
    }
}

// ── Background reconnection loop ─────────────────────────────────────

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Main loop: connect → read → emit `Disconnect` → backoff → reconnect.
async fn push_loop(
    url: Url,
    event_tx: broadcast::Sender<Arc<PushEvent>>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = open(&url) => result,
        };

        let delay = match opened {
            Ok(ws) => {
                attempt = 0;
                let result = read_session(ws, &event_tx, &cancel).await;
                if cancel.is_cancelled() {
                    break;
                }
                let reason = match result {
                    Ok(()) => "connection closed by server".to_owned(),
                    Err(e) => {
                        tracing::warn!(error = %e, "push channel session ended with error");
                        e.to_string()
                    }
                };
                // Ignore send errors -- just means no active subscribers right now
                let _ = event_tx.send(Arc::new(PushEvent::Disconnect { reason }));
                calculate_backoff(0, &reconnect)
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "push channel connect failed");

                if let Some(max) = reconnect.max_retries {
                    if attempt >= max {
                        tracing::error!(
                            max_retries = max,
                            "push channel reconnection limit reached, giving up"
                        );
                        break;
                    }
                }

                let delay = calculate_backoff(attempt, &reconnect);
                attempt = attempt.saturating_add(1);
                delay
            }
        };

        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!("push channel loop exiting");
}

async fn open(url: &Url) -> Result<WsStream, Error> {
    tracing::info!(url = %url, "connecting push channel");
    let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::PushConnect(e.to_string()))?;
    Ok(ws)
}

// ── Single connection lifecycle ──────────────────────────────────────

/// What the read loop should do after one text frame.
#[derive(Debug, PartialEq)]
enum Step {
    Continue,
    /// Send this frame back to the server.
    Reply(String),
    /// Engine.IO handshake: join the default namespace and adopt the
    /// server's heartbeat window.
    Opened { reply: String, liveness: Duration },
    /// The server ended the session.
    Closed,
}

/// Read frames until the connection drops, answering heartbeats.
///
/// Returns `Ok(())` on a clean close (or cancellation).
async fn read_session(
    ws: WsStream,
    event_tx: &broadcast::Sender<Arc<PushEvent>>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let (mut write, mut read) = ws.split();
    let mut liveness = DEFAULT_LIVENESS;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(Message::text(EnginePacket::Close.encode())).await;
                let _ = write.close().await;
                return Ok(());
            }
            next = tokio::time::timeout(liveness, read.next()) => next,
        };

        let Ok(frame) = next else {
            return Err(Error::Timeout {
                timeout_secs: liveness.as_secs(),
            });
        };

        match frame {
            Some(Ok(Message::Text(text))) => match on_text_frame(text.as_str(), event_tx)? {
                Step::Continue => {}
                Step::Reply(reply) => send(&mut write, reply).await?,
                Step::Opened { reply, liveness: window } => {
                    liveness = window;
                    send(&mut write, reply).await?;
                }
                Step::Closed => return Ok(()),
            },
            Some(Ok(Message::Close(frame))) => {
                return match frame {
                    Some(cf) => {
                        tracing::info!(code = %cf.code, reason = %cf.reason.as_str(), "push channel close frame");
                        Err(Error::PushClosed {
                            code: u16::from(cf.code),
                            reason: cf.reason.as_str().to_owned(),
                        })
                    }
                    None => {
                        tracing::info!("push channel close frame (no payload)");
                        Ok(())
                    }
                };
            }
            Some(Err(e)) => return Err(Error::PushConnect(e.to_string())),
            None => {
                tracing::info!("push channel stream ended");
                return Ok(());
            }
            // Binary, Ping, Pong, Frame -- tungstenite answers pings itself
            Some(Ok(_)) => {}
        }
    }
}

async fn send<S>(write: &mut S, frame: String) -> Result<(), Error>
where
    S: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    write
        .send(Message::text(frame))
        .await
        .map_err(|e| Error::PushConnect(e.to_string()))
}

// ── Frame handling ───────────────────────────────────────────────────

/// Decode one text frame, broadcast any event inside, and decide the
/// reply.
///
/// A malformed frame or event payload fails only that frame: it is logged
/// and skipped. A refused namespace join ends the session.
fn on_text_frame(
    text: &str,
    event_tx: &broadcast::Sender<Arc<PushEvent>>,
) -> Result<Step, Error> {
    let packet = match EnginePacket::decode(text) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "skipping undecodable push frame");
            return Ok(Step::Continue);
        }
    };

    match packet {
        EnginePacket::Open(handshake) => {
            tracing::debug!(sid = %handshake.sid, "push channel handshake");
            let window = handshake
                .ping_interval
                .saturating_add(handshake.ping_timeout);
            Ok(Step::Opened {
                reply: EnginePacket::Message(SocketPacket::connect_request().encode()).encode(),
                liveness: Duration::from_millis(window),
            })
        }
        EnginePacket::Ping(data) => Ok(Step::Reply(EnginePacket::Pong(data).encode())),
        EnginePacket::Close => Ok(Step::Closed),
        EnginePacket::Message(body) => on_socket_packet(&body, event_tx),
        EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => Ok(Step::Continue),
    }
}

fn on_socket_packet(
    body: &str,
    event_tx: &broadcast::Sender<Arc<PushEvent>>,
) -> Result<Step, Error> {
    let packet = match SocketPacket::decode(body) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "skipping undecodable Socket.IO packet");
            return Ok(Step::Continue);
        }
    };

    match packet {
        SocketPacket::Connect(_) => {
            tracing::info!("push channel joined");
            Ok(Step::Continue)
        }
        SocketPacket::Disconnect => Ok(Step::Closed),
        SocketPacket::ConnectError(data) => Err(Error::Protocol(format!(
            "namespace join refused: {data}"
        ))),
        SocketPacket::Event { name, payload, .. } => {
            match PushEvent::from_socket_event(&name, payload) {
                Ok(Some(event)) => {
                    let _ = event_tx.send(Arc::new(event));
                }
                Ok(None) => tracing::debug!(event = %name, "ignoring unknown push event"),
                Err(e) => tracing::debug!(error = %e, "skipping malformed push event"),
            }
            Ok(Step::Continue)
        }
        SocketPacket::Ack { .. } => Ok(Step::Continue),
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% so a fleet of consoles does not reconnect in lockstep
/// after a server restart.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(31)).unwrap_or(31);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        // Jitter factor tops out at 1.25.
        let d10 = calculate_backoff(10, &config);
        assert!(d10 <= Duration::from_millis(12_500), "got {d10:?}");
        let huge = calculate_backoff(u32::MAX, &config);
        assert!(huge <= Duration::from_millis(12_500), "got {huge:?}");
    }

    #[test]
    fn handshake_joins_namespace_and_adopts_heartbeat() {
        let (tx, _rx) = broadcast::channel(16);
        let step = on_text_frame(
            r#"0{"sid":"abc","upgrades":[],"pingInterval":1000,"pingTimeout":500}"#,
            &tx,
        )
        .unwrap();
        assert_eq!(
            step,
            Step::Opened {
                reply: "40".into(),
                liveness: Duration::from_millis(1500),
            }
        );
    }

    #[test]
    fn ping_gets_pong() {
        let (tx, _rx) = broadcast::channel(16);
        assert_eq!(on_text_frame("2", &tx).unwrap(), Step::Reply("3".into()));
    }

    #[test]
    fn log_event_is_broadcast() {
        let (tx, mut rx) = broadcast::channel(16);
        let frame = format!(
            "42{}",
            json!(["log", {"timestamp": "10:00:00", "message": "hello"}])
        );
        assert_eq!(on_text_frame(&frame, &tx).unwrap(), Step::Continue);

        let event = rx.try_recv().unwrap();
        assert_eq!(
            *event,
            PushEvent::Log(LogEntry::new("10:00:00", "hello"))
        );
    }

    #[test]
    fn initial_logs_event_is_broadcast_in_order() {
        let (tx, mut rx) = broadcast::channel(16);
        let frame = format!(
            "42{}",
            json!(["initial_logs", {"logs": [
                {"timestamp": "09:00:00", "message": "one"},
                {"timestamp": "09:00:01", "message": "two"}
            ]}])
        );
        on_text_frame(&frame, &tx).unwrap();

        let PushEvent::InitialLogs(logs) = rx.try_recv().unwrap().as_ref().clone() else {
            panic!("expected initial_logs");
        };
        let messages: Vec<_> = logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, ["one", "two"]);
    }

    #[test]
    fn unknown_and_malformed_events_are_skipped() {
        let (tx, mut rx) = broadcast::channel(16);
        on_text_frame(r#"42["status_update",{"running":true}]"#, &tx).unwrap();
        on_text_frame(r#"42["initial_logs",{"logs":"not a list"}]"#, &tx).unwrap();
        on_text_frame("not a frame", &tx).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn close_and_disconnect_end_the_session() {
        let (tx, _rx) = broadcast::channel(16);
        assert_eq!(on_text_frame("1", &tx).unwrap(), Step::Closed);
        assert_eq!(on_text_frame("41", &tx).unwrap(), Step::Closed);
    }

    #[test]
    fn refused_join_is_an_error() {
        let (tx, _rx) = broadcast::channel(16);
        let err = on_text_frame(r#"44{"message":"unauthorized"}"#, &tx).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn connected_event_without_payload() {
        let event = PushEvent::from_socket_event("connected", Value::Null)
            .unwrap()
            .unwrap();
        assert_eq!(event, PushEvent::Connected { message: None });
    }
}
