// ── Engine.IO v4 / Socket.IO v5 framing ──
//
// Text-frame codec for the subset of the protocol the admin server uses:
// the Engine.IO handshake, heartbeat, and close packets, and Socket.IO
// connect/disconnect/event packets on the default namespace. Binary
// attachments are not supported.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

// ── Engine.IO ────────────────────────────────────────────────────────

/// Handshake payload carried by the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    /// Server ping cadence in milliseconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Grace period after a missed ping, in milliseconds.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
    #[serde(default)]
    pub upgrades: Vec<String>,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

/// One Engine.IO packet (one WebSocket text frame).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    /// Payload is a Socket.IO packet.
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self, Error> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::Protocol("empty Engine.IO frame".into()))?;
        let rest = chars.as_str();
        match kind {
            '0' => serde_json::from_str(rest)
                .map(Self::Open)
                .map_err(|e| Error::Protocol(format!("bad handshake: {e}"))),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(rest.to_owned())),
            '3' => Ok(Self::Pong(rest.to_owned())),
            '4' => Ok(Self::Message(rest.to_owned())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(Error::Protocol(format!(
                "unknown Engine.IO packet type {other:?}"
            ))),
        }
    }

    /// Encode a client-originated packet. `Open` is server-only and
    /// encodes as a bare type digit.
    pub fn encode(&self) -> String {
        match self {
            Self::Open(_) => "0".into(),
            Self::Close => "1".into(),
            Self::Ping(data) => format!("2{data}"),
            Self::Pong(data) => format!("3{data}"),
            Self::Message(body) => format!("4{body}"),
            Self::Upgrade => "5".into(),
            Self::Noop => "6".into(),
        }
    }
}

// ── Socket.IO ────────────────────────────────────────────────────────

/// One Socket.IO packet, as carried inside an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event {
        name: String,
        /// First event argument; `Null` for argument-less events.
        payload: Value,
        ack: Option<u64>,
    },
    Ack {
        id: u64,
    },
    ConnectError(Value),
}

impl SocketPacket {
    /// The `CONNECT` request for the default namespace.
    pub fn connect_request() -> Self {
        Self::Connect(None)
    }

    pub fn decode(body: &str) -> Result<Self, Error> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::Protocol("empty Socket.IO packet".into()))?;
        let mut rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(Error::Protocol(
                "binary Socket.IO packets are not supported".into(),
            ));
        }

        // Optional namespace: "/name," -- only the default namespace is used.
        if rest.starts_with('/') {
            rest = rest.split_once(',').map_or("", |(_, tail)| tail);
        }

        // Optional ack id: a run of digits before the JSON body.
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        let ack = if digits > 0 {
            let (id, tail) = rest.split_at(digits);
            rest = tail;
            Some(
                id.parse::<u64>()
                    .map_err(|e| Error::Protocol(format!("bad ack id: {e}")))?,
            )
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(rest)
                    .map_err(|e| Error::Protocol(format!("bad packet body: {e}")))?,
            )
        };

        match kind {
            '0' => Ok(Self::Connect(data)),
            '1' => Ok(Self::Disconnect),
            '2' => {
                let Some(Value::Array(mut args)) = data else {
                    return Err(Error::Protocol("event body must be an array".into()));
                };
                if args.is_empty() {
                    return Err(Error::Protocol("event without a name".into()));
                }
                let Value::String(name) = args.remove(0) else {
                    return Err(Error::Protocol("event name must be a string".into()));
                };
                let payload = if args.is_empty() {
                    Value::Null
                } else {
                    args.swap_remove(0)
                };
                Ok(Self::Event { name, payload, ack })
            }
            '3' => Ok(Self::Ack {
                id: ack.ok_or_else(|| Error::Protocol("ack without id".into()))?,
            }),
            '4' => Ok(Self::ConnectError(data.unwrap_or(Value::Null))),
            other => Err(Error::Protocol(format!(
                "unknown Socket.IO packet type {other:?}"
            ))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Connect(None) => "0".into(),
            Self::Connect(Some(auth)) => format!("0{auth}"),
            Self::Disconnect => "1".into(),
            Self::Event { name, payload, ack } => {
                let args = if payload.is_null() {
                    Value::Array(vec![Value::String(name.clone())])
                } else {
                    Value::Array(vec![Value::String(name.clone()), payload.clone()])
                };
                match ack {
                    Some(id) => format!("2{id}{args}"),
                    None => format!("2{args}"),
                }
            }
            Self::Ack { id } => format!("3{id}[]"),
            Self::ConnectError(data) => format!("4{data}"),
        }
    }
}
