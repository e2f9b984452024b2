//! Live guild/channel membership maintained from gateway dispatches.
//!
//! Destinations are named, not cached ids: resolution runs against this
//! directory at send time, so a channel created after startup resolves as
//! soon as its dispatch arrives, and a miss is a send error rather than a
//! configuration error.

use std::collections::HashMap;

use relay_core::ChannelRef;
use serde::Deserialize;
use serde_json::Value;

// Discord channel types that accept plain text posts.
const CHANNEL_TYPE_GUILD_TEXT: u64 = 0;
const CHANNEL_TYPE_GUILD_ANNOUNCEMENT: u64 = 5;

#[derive(Debug, Clone, Deserialize)]
struct GatewayChannel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: u64,
    #[serde(default)]
    guild_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayGuild {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    channels: Vec<GatewayChannel>,
}

#[derive(Debug, Clone)]
struct ChannelEntry {
    name: String,
    kind: u64,
}

#[derive(Debug, Clone, Default)]
struct GuildEntry {
    name: String,
    channels: HashMap<String, ChannelEntry>,
}

#[derive(Debug, Default)]
/// Guild-id keyed directory of known guilds and their channels.
pub(super) struct GuildDirectory {
    guilds: HashMap<String, GuildEntry>,
}

impl GuildDirectory {
    /// Applies a GUILD_CREATE/GUILD_UPDATE payload, replacing any prior entry.
    pub(super) fn apply_guild(&mut self, payload: &Value) {
        let Ok(guild) = serde_json::from_value::<GatewayGuild>(payload.clone()) else {
            tracing::debug!("ignoring malformed guild dispatch");
            return;
        };
        let Some(name) = guild.name.filter(|name| !name.is_empty()) else {
            return;
        };
        let entry = self.guilds.entry(guild.id).or_default();
        entry.name = name;
        for channel in guild.channels {
            if let Some(channel_name) = channel.name {
                entry.channels.insert(
                    channel.id,
                    ChannelEntry {
                        name: channel_name,
                        kind: channel.kind,
                    },
                );
            }
        }
    }

    pub(super) fn apply_guild_delete(&mut self, payload: &Value) {
        if let Some(guild_id) = payload.get("id").and_then(Value::as_str) {
            self.guilds.remove(guild_id);
        }
    }

    /// Applies a CHANNEL_CREATE/CHANNEL_UPDATE payload to its guild.
    pub(super) fn apply_channel(&mut self, payload: &Value) {
        let Ok(channel) = serde_json::from_value::<GatewayChannel>(payload.clone()) else {
            tracing::debug!("ignoring malformed channel dispatch");
            return;
        };
        let (Some(guild_id), Some(name)) = (channel.guild_id, channel.name) else {
            return;
        };
        if let Some(guild) = self.guilds.get_mut(&guild_id) {
            guild.channels.insert(
                channel.id,
                ChannelEntry {
                    name,
                    kind: channel.kind,
                },
            );
        }
    }

    pub(super) fn apply_channel_delete(&mut self, payload: &Value) {
        let guild_id = payload.get("guild_id").and_then(Value::as_str);
        let channel_id = payload.get("id").and_then(Value::as_str);
        if let (Some(guild_id), Some(channel_id)) = (guild_id, channel_id) {
            if let Some(guild) = self.guilds.get_mut(guild_id) {
                guild.channels.remove(channel_id);
            }
        }
    }

    /// Resolves a (server, channel) name pair to a postable channel id.
    pub(super) fn resolve(&self, destination: &ChannelRef) -> Option<String> {
        let guild = self
            .guilds
            .values()
            .find(|guild| guild.name == destination.server_name)?;
        guild
            .channels
            .iter()
            .find(|(_, channel)| {
                channel.name == destination.channel_name
                    && matches!(
                        channel.kind,
                        CHANNEL_TYPE_GUILD_TEXT | CHANNEL_TYPE_GUILD_ANNOUNCEMENT
                    )
            })
            .map(|(channel_id, _)| channel_id.clone())
    }
}
