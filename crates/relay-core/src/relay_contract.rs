//! Contract types flowing between ingress, renderer, and session connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Webhook providers the relay accepts events from.
pub enum WebhookProvider {
    Github,
    UnityCloudBuild,
}

impl WebhookProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::UnityCloudBuild => "unity_cloud_build",
        }
    }
}

#[derive(Debug, Clone)]
/// One decoded inbound webhook delivery. Built per HTTP request and discarded
/// after rendering.
pub struct WebhookEvent {
    pub provider: WebhookProvider,
    pub event_type: String,
    pub raw_payload: Value,
}

impl WebhookEvent {
    pub fn new(provider: WebhookProvider, event_type: impl Into<String>, raw_payload: Value) -> Self {
        Self {
            provider,
            event_type: event_type.into(),
            raw_payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Logical (server, channel) destination, resolved against live session
/// membership at send time rather than at configuration load.
pub struct ChannelRef {
    pub server_name: String,
    pub channel_name: String,
}

impl ChannelRef {
    pub fn new(server_name: impl Into<String>, channel_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            channel_name: channel_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Formatted chat text plus its destination. Consumed exactly once by the
/// session connection.
pub struct RenderedMessage {
    pub text: String,
    pub destination: ChannelRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Renderer result: a message to deliver, or a recognized provider event the
/// relay deliberately ignores.
pub enum RenderOutcome {
    Rendered(RenderedMessage),
    Unhandled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Delivery confirmation returned through the bridge result slot.
pub struct SendReceipt {
    pub channel_id: String,
    pub message_id: String,
}
