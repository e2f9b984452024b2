//! Gateway wire helpers: opcodes, frame parsing, and handshake payloads.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message as WsMessage;

pub(super) const OP_DISPATCH: u8 = 0;
pub(super) const OP_HEARTBEAT: u8 = 1;
pub(super) const OP_IDENTIFY: u8 = 2;
pub(super) const OP_RECONNECT: u8 = 7;
pub(super) const OP_INVALID_SESSION: u8 = 9;
pub(super) const OP_HELLO: u8 = 10;
pub(super) const OP_HEARTBEAT_ACK: u8 = 11;

// GUILDS intent: guild and channel create/update/delete dispatches, which is
// all the directory needs for name resolution.
const GATEWAY_INTENT_GUILDS: u64 = 1 << 0;

#[derive(Debug, Clone, Deserialize)]
/// One decoded gateway frame. `d` stays opaque; dispatch handlers pick out
/// the fields they need.
pub(super) struct GatewayFrame {
    pub op: u8,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
    #[serde(default)]
    pub d: Value,
}

/// Decodes a websocket message into a gateway frame. Control frames and the
/// peer's close are not frames; they yield `None`.
pub(super) fn parse_gateway_frame(message: WsMessage) -> Result<Option<GatewayFrame>> {
    match message {
        WsMessage::Text(text) => {
            let frame: GatewayFrame = serde_json::from_str(text.as_str())
                .context("failed to parse discord gateway frame")?;
            Ok(Some(frame))
        }
        WsMessage::Close(_) | WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Binary(_) => {
            Ok(None)
        }
        _ => Ok(None),
    }
}

pub(super) fn identify_payload(token: &str) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": GATEWAY_INTENT_GUILDS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "hook-relay",
                "device": "hook-relay"
            }
        }
    })
}

pub(super) fn heartbeat_payload(last_seq: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": last_seq })
}
