//! Shared contract types, error taxonomy, and configuration for the relay.
//!
//! Every other relay crate depends on this one; it carries no I/O beyond
//! reading the process environment at startup.

pub mod relay_config;
pub mod relay_contract;
pub mod relay_errors;
pub mod time_utils;

pub use relay_config::DiscordSettings;
pub use relay_contract::{
    ChannelRef, RenderOutcome, RenderedMessage, SendReceipt, WebhookEvent, WebhookProvider,
};
pub use relay_errors::{RenderError, SessionSendError};
pub use time_utils::current_unix_timestamp_ms;
