//! Required Discord settings sourced from the process environment.

use anyhow::{Context, Result};

use crate::relay_contract::ChannelRef;

pub const DISCORD_SERVER_ENV: &str = "DISCORD_SERVER";
pub const DISCORD_CHANNEL_ENV: &str = "DISCORD_CHANNEL";
pub const DISCORD_TOKEN_ENV: &str = "DISCORD_TOKEN";

#[derive(Debug, Clone)]
/// The three values the relay cannot start without. Absence of any is a fatal
/// startup error; the destination itself is only resolved at send time.
pub struct DiscordSettings {
    pub server_name: String,
    pub channel_name: String,
    pub token: String,
}

impl DiscordSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server_name: required_env(DISCORD_SERVER_ENV)?,
            channel_name: required_env(DISCORD_CHANNEL_ENV)?,
            token: required_env(DISCORD_TOKEN_ENV)?,
        })
    }

    pub fn destination(&self) -> ChannelRef {
        ChannelRef::new(self.server_name.clone(), self.channel_name.clone())
    }
}

fn required_env(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .with_context(|| format!("required environment variable {name} is not set"))?;
    let value = value.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("required environment variable {name} is empty");
    }
    Ok(value)
}
