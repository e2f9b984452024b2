//! Session connection to the chat backend and the cross-context dispatch
//! bridge that feeds it.
//!
//! Exactly one task owns the live Discord connection; every other context
//! reaches it only through the bridge queue and per-request result slots.

pub mod discord_runtime;
pub mod session_bridge;

pub use discord_runtime::{
    spawn_discord_session, DiscordSessionConfig, SessionState, DEFAULT_DISCORD_API_BASE,
    DEFAULT_DISCORD_GATEWAY_URL,
};
pub use session_bridge::{
    session_bridge, SendRequest, SendSubmitter, SessionBridge, DEFAULT_SEND_QUEUE_DEPTH,
};
