//! Text framing for socket.io v5 running over engine.io v4.
//!
//! Only the websocket transport is spoken, so every frame is a single
//! text message: one engine.io type digit followed by its payload. A
//! `Message` frame wraps a socket.io packet, which in turn is a type
//! digit, an optional `/namespace,`, an optional ack id and a JSON body.
//! Binary attachments are not supported.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::PushError;

/// Handshake payload sent by the server in the `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: u64,
}

/// Heartbeat used until the server's handshake says otherwise.
pub const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 20_000;

pub fn heartbeat_deadline(ping_interval_ms: u64, ping_timeout_ms: u64) -> Duration {
    Duration::from_millis(ping_interval_ms.saturating_add(ping_timeout_ms))
}

impl Handshake {
    /// How long the link may stay quiet before it counts as dead. Missing
    /// fields fall back to the engine.io defaults.
    pub fn heartbeat_deadline(&self) -> Duration {
        let or_default = |value: u64, default: u64| if value == 0 { default } else { value };
        heartbeat_deadline(
            or_default(self.ping_interval, DEFAULT_PING_INTERVAL_MS),
            or_default(self.ping_timeout, DEFAULT_PING_TIMEOUT_MS),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value>, ack: Option<u64> },
    Ack { id: u64, args: Vec<Value> },
    ConnectError(Value),
}

pub fn decode(frame: &str) -> Result<Packet, PushError> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| PushError::Protocol("empty frame".into()))?;
    let rest = chars.as_str();
    match kind {
        '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => Ok(Packet::Message(decode_socket(rest)?)),
        '5' => Ok(Packet::Upgrade),
        '6' => Ok(Packet::Noop),
        other => Err(PushError::Protocol(format!("unknown engine.io packet type {other:?}"))),
    }
}

fn decode_socket(body: &str) -> Result<SocketPacket, PushError> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| PushError::Protocol("empty socket.io packet".into()))?;
    let mut rest = chars.as_str();

    // namespace prefix, e.g. `/admin,`
    if rest.starts_with('/') {
        rest = match rest.find(',') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        };
    }

    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    let ack = if digits > 0 {
        let id = rest[..digits]
            .parse::<u64>()
            .map_err(|e| PushError::Protocol(e.to_string()))?;
        rest = &rest[digits..];
        Some(id)
    } else {
        None
    };

    let json = || -> Result<Value, PushError> {
        if rest.is_empty() { Ok(Value::Null) } else { Ok(serde_json::from_str(rest)?) }
    };

    match kind {
        '0' => {
            let data = json()?;
            Ok(SocketPacket::Connect(if data.is_null() { None } else { Some(data) }))
        }
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let mut args = match json()? {
                Value::Array(items) => items,
                other => return Err(PushError::Protocol(format!("event body is not an array: {other}"))),
            };
            if args.is_empty() {
                return Err(PushError::Protocol("event without a name".into()));
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                other => return Err(PushError::Protocol(format!("event name is not a string: {other}"))),
            };
            Ok(SocketPacket::Event { name, args, ack })
        }
        '3' => {
            let id = ack.ok_or_else(|| PushError::Protocol("ack without id".into()))?;
            let args = match json()? {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            Ok(SocketPacket::Ack { id, args })
        }
        '4' => Ok(SocketPacket::ConnectError(json()?)),
        '5' | '6' => Err(PushError::Protocol("binary packets are not supported".into())),
        other => Err(PushError::Protocol(format!("unknown socket.io packet type {other:?}"))),
    }
}

/// Frames the client writes. Everything else only travels server to client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Join the default namespace after the open handshake.
    Connect,
    Pong,
}

pub fn encode(reply: Reply) -> &'static str {
    match reply {
        Reply::Connect => "40",
        Reply::Pong => "3",
    }
}
