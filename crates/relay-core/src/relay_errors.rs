//! Error taxonomy shared across relay crates.
//!
//! Render-side failures stay local to the request that produced them; send-side
//! failures travel back through the bridge result slot to the ingress layer.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures produced while rendering a webhook payload into chat text.
pub enum RenderError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl RenderError {
    pub fn missing_field(field: &str) -> Self {
        Self::MalformedPayload(format!("missing required field `{field}`"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures surfaced from the session connection through the bridge.
pub enum SessionSendError {
    #[error("session connection is not ready")]
    ConnectionNotReady,
    #[error("destination not found: server `{server_name}` channel `{channel_name}`")]
    DestinationNotFound {
        server_name: String,
        channel_name: String,
    },
    #[error("send was not confirmed within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("relay is shutting down")]
    ShuttingDown,
    #[error("chat backend rejected send: {0}")]
    Backend(String),
}

impl SessionSendError {
    /// True when the failure means the relay itself is broken rather than a
    /// delivery-state condition the webhook sender cannot act on.
    pub fn is_relay_fault(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::ShuttingDown | Self::Backend(_)
        )
    }
}
