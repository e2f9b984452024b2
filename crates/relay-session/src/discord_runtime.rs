//! Discord session runtime: one long-lived task owns the gateway connection,
//! maintains the live guild/channel directory, and drains the bridge queue.
//!
//! The outer loop reconnects with a fixed delay after connection loss, the
//! same shape as a socket-mode chat transport: connect, handshake, then a
//! single select loop over gateway traffic and queued sends. Sends execute
//! strictly one at a time on this task; no other context touches the
//! connection.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use relay_core::{SendReceipt, SessionSendError};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::session_bridge::SendRequest;

mod discord_api_client;
mod discord_directory;
mod discord_gateway;

use discord_api_client::DiscordApiClient;
use discord_directory::GuildDirectory;
use discord_gateway::{
    heartbeat_payload, identify_payload, parse_gateway_frame, GatewayFrame, OP_DISPATCH,
    OP_HEARTBEAT, OP_HEARTBEAT_ACK, OP_HELLO, OP_INVALID_SESSION, OP_RECONNECT,
};

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

const HELLO_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
/// Runtime configuration for the Discord session task.
pub struct DiscordSessionConfig {
    pub token: String,
    pub api_base: String,
    pub gateway_url: String,
    pub request_timeout_ms: u64,
    pub reconnect_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Session connection lifecycle, published through a watch channel.
pub enum SessionState {
    Disconnected,
    Connecting,
    Ready,
    Disconnecting,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Disconnecting => "disconnecting",
        }
    }
}

enum SessionExit {
    Shutdown,
    ConnectionLost,
}

/// Spawns the session task. Connecting proceeds asynchronously; the caller
/// gets the state watch and the task handle, never a blocking start.
pub fn spawn_discord_session(
    config: DiscordSessionConfig,
    queue_rx: mpsc::Receiver<SendRequest>,
    shutdown_rx: watch::Receiver<bool>,
) -> (
    tokio::task::JoinHandle<Result<()>>,
    watch::Receiver<SessionState>,
) {
    let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
    let task = tokio::spawn(run_discord_session(config, queue_rx, state_tx, shutdown_rx));
    (task, state_rx)
}

/// Runs the session loop until shutdown. Connection losses transition to
/// Disconnected and reconnect after the configured delay; sends arriving in
/// the gap fail fast with ConnectionNotReady instead of waiting out the
/// submitter's timeout.
pub async fn run_discord_session(
    config: DiscordSessionConfig,
    mut queue_rx: mpsc::Receiver<SendRequest>,
    state_tx: watch::Sender<SessionState>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let api_client = DiscordApiClient::new(
        config.api_base.clone(),
        config.token.clone(),
        config.request_timeout_ms,
    )?;

    loop {
        if *shutdown_rx.borrow() {
            finish_shutdown(&state_tx, &mut queue_rx);
            return Ok(());
        }

        state_tx.send_replace(SessionState::Connecting);
        let exit = run_gateway_session(
            &config,
            &api_client,
            &mut queue_rx,
            &state_tx,
            &mut shutdown_rx,
        )
        .await;

        match exit {
            Ok(SessionExit::Shutdown) => {
                finish_shutdown(&state_tx, &mut queue_rx);
                return Ok(());
            }
            Ok(SessionExit::ConnectionLost) => {
                tracing::warn!("discord gateway connection lost, reconnecting");
            }
            Err(error) => {
                tracing::warn!(%error, "discord gateway session failed, reconnecting");
            }
        }

        state_tx.send_replace(SessionState::Disconnected);
        if reject_sends_for(&mut queue_rx, &mut shutdown_rx, config.reconnect_delay).await {
            finish_shutdown(&state_tx, &mut queue_rx);
            return Ok(());
        }
    }
}

fn finish_shutdown(state_tx: &watch::Sender<SessionState>, queue_rx: &mut mpsc::Receiver<SendRequest>) {
    state_tx.send_replace(SessionState::Disconnecting);
    queue_rx.close();
    while let Ok(request) = queue_rx.try_recv() {
        request.fulfill(Err(SessionSendError::ShuttingDown));
    }
    state_tx.send_replace(SessionState::Disconnected);
}

/// Answers queued sends with ConnectionNotReady while waiting to reconnect.
/// Returns true when shutdown was requested during the wait.
async fn reject_sends_for(
    queue_rx: &mut mpsc::Receiver<SendRequest>,
    shutdown_rx: &mut watch::Receiver<bool>,
    delay: Duration,
) -> bool {
    let deadline = tokio::time::sleep(delay);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => return false,
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    return true;
                }
            }
            maybe_request = queue_rx.recv() => {
                match maybe_request {
                    Some(request) => request.fulfill(Err(SessionSendError::ConnectionNotReady)),
                    None => return true,
                }
            }
        }
    }
}

async fn run_gateway_session(
    config: &DiscordSessionConfig,
    api_client: &DiscordApiClient,
    queue_rx: &mut mpsc::Receiver<SendRequest>,
    state_tx: &watch::Sender<SessionState>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<SessionExit> {
    let (stream, _response) = connect_async(config.gateway_url.as_str())
        .await
        .context("failed to connect discord gateway websocket")?;
    let (mut sink, mut source) = stream.split();

    let heartbeat_interval_ms = await_hello(&mut source).await?;
    sink.send(WsMessage::Text(
        identify_payload(&config.token).to_string().into(),
    ))
    .await
    .context("failed to send discord identify")?;

    let mut directory = GuildDirectory::default();
    let mut heartbeat = tokio::time::interval(Duration::from_millis(heartbeat_interval_ms.max(1)));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_seq: Option<u64> = None;
    let mut ready = false;
    let mut awaiting_heartbeat_ack = false;

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return Ok(SessionExit::Shutdown);
                }
            }
            _ = heartbeat.tick() => {
                // An unacknowledged heartbeat means the connection zombied.
                if awaiting_heartbeat_ack {
                    tracing::warn!("discord heartbeat went unacknowledged");
                    return Ok(SessionExit::ConnectionLost);
                }
                sink.send(WsMessage::Text(heartbeat_payload(last_seq).to_string().into()))
                    .await
                    .context("failed to send discord heartbeat")?;
                awaiting_heartbeat_ack = true;
            }
            maybe_message = source.next() => {
                let Some(message_result) = maybe_message else {
                    return Ok(SessionExit::ConnectionLost);
                };
                let message = message_result.context("failed reading discord gateway message")?;
                let Some(frame) = parse_gateway_frame(message)? else {
                    continue;
                };
                if let Some(seq) = frame.s {
                    last_seq = Some(seq);
                }
                match frame.op {
                    OP_DISPATCH => {
                        handle_dispatch(&frame, &mut directory, state_tx, &mut ready);
                    }
                    OP_HEARTBEAT => {
                        sink.send(WsMessage::Text(heartbeat_payload(last_seq).to_string().into()))
                            .await
                            .context("failed to answer discord heartbeat request")?;
                    }
                    OP_RECONNECT | OP_INVALID_SESSION => {
                        tracing::info!(op = frame.op, "discord gateway requested reconnect");
                        return Ok(SessionExit::ConnectionLost);
                    }
                    OP_HEARTBEAT_ACK => {
                        awaiting_heartbeat_ack = false;
                    }
                    OP_HELLO => {}
                    other => {
                        tracing::debug!(op = other, "ignoring unknown discord gateway opcode");
                    }
                }
            }
            maybe_request = queue_rx.recv() => {
                let Some(request) = maybe_request else {
                    return Ok(SessionExit::Shutdown);
                };
                handle_send_request(request, ready, &directory, api_client).await;
            }
        }
    }
}

fn handle_dispatch(
    frame: &GatewayFrame,
    directory: &mut GuildDirectory,
    state_tx: &watch::Sender<SessionState>,
    ready: &mut bool,
) {
    match frame.t.as_deref() {
        Some("READY") => {
            let username = frame
                .d
                .pointer("/user/username")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown");
            let user_id = frame
                .d
                .pointer("/user/id")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown");
            tracing::info!(username, user_id, "discord session ready, logged in");
            *ready = true;
            state_tx.send_replace(SessionState::Ready);
        }
        Some("GUILD_CREATE") | Some("GUILD_UPDATE") => directory.apply_guild(&frame.d),
        Some("GUILD_DELETE") => directory.apply_guild_delete(&frame.d),
        Some("CHANNEL_CREATE") | Some("CHANNEL_UPDATE") => directory.apply_channel(&frame.d),
        Some("CHANNEL_DELETE") => directory.apply_channel_delete(&frame.d),
        _ => {}
    }
}

/// Executes one queued send on this task. Resolution against the live
/// directory and the REST post both happen here, so at most one send is in
/// flight against the connection at any instant.
async fn handle_send_request(
    request: SendRequest,
    ready: bool,
    directory: &GuildDirectory,
    api_client: &DiscordApiClient,
) {
    if !ready {
        request.fulfill(Err(SessionSendError::ConnectionNotReady));
        return;
    }
    let destination = request.message.destination.clone();
    let Some(channel_id) = directory.resolve(&destination) else {
        request.fulfill(Err(SessionSendError::DestinationNotFound {
            server_name: destination.server_name,
            channel_name: destination.channel_name,
        }));
        return;
    };

    let outcome: Result<SendReceipt, SessionSendError> = api_client
        .create_message(&channel_id, &request.message.text)
        .await
        .map_err(|error| SessionSendError::Backend(error.to_string()));
    if let Err(error) = &outcome {
        tracing::warn!(%error, %channel_id, "discord message send failed");
    }
    request.fulfill(outcome);
}

async fn await_hello<S>(source: &mut S) -> Result<u64>
where
    S: futures_util::Stream<
            Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>,
        > + Unpin,
{
    let wait = async {
        loop {
            let message = source
                .next()
                .await
                .context("discord gateway closed before hello")?
                .context("failed reading discord gateway hello")?;
            let Some(frame) = parse_gateway_frame(message)? else {
                continue;
            };
            if frame.op == OP_HELLO {
                return frame
                    .d
                    .pointer("/heartbeat_interval")
                    .and_then(serde_json::Value::as_u64)
                    .context("discord hello missing heartbeat_interval");
            }
        }
    };
    tokio::time::timeout(Duration::from_millis(HELLO_TIMEOUT_MS), wait)
        .await
        .context("timed out waiting for discord gateway hello")?
}
