//! hook-relay: relays GitHub and Unity Cloud Build webhooks into a Discord
//! channel through a single session connection.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use relay_core::DiscordSettings;
use relay_ingress::{build_ingress_router, IngressState};
use relay_render::UrlShortener;
use relay_session::{
    session_bridge, spawn_discord_session, DiscordSessionConfig, DEFAULT_DISCORD_API_BASE,
    DEFAULT_DISCORD_GATEWAY_URL, DEFAULT_SEND_QUEUE_DEPTH,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "hook-relay",
    about = "Relays GitHub and Unity Cloud Build webhooks into a Discord channel",
    version
)]
struct RelayArgs {
    #[arg(
        long,
        env = "RELAY_BIND",
        default_value = "0.0.0.0:4000",
        help = "Address the webhook ingress listens on."
    )]
    bind: String,

    #[arg(long, env = "DISCORD_API_BASE", default_value = DEFAULT_DISCORD_API_BASE)]
    discord_api_base: String,

    #[arg(long, env = "DISCORD_GATEWAY_URL", default_value = DEFAULT_DISCORD_GATEWAY_URL)]
    discord_gateway_url: String,

    #[arg(
        long,
        env = "SHORTENER_BASE",
        default_value = "https://git.io",
        help = "Link-shortener endpoint; failures fall back to the original URL."
    )]
    shortener_base: String,

    #[arg(
        long,
        env = "RELAY_SEND_TIMEOUT_MS",
        default_value_t = 10_000,
        help = "How long a webhook request waits for send confirmation."
    )]
    send_timeout_ms: u64,

    #[arg(long, env = "RELAY_REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    request_timeout_ms: u64,

    #[arg(long, env = "RELAY_RECONNECT_DELAY_MS", default_value_t = 5_000)]
    reconnect_delay_ms: u64,

    #[arg(
        long,
        env = "RELAY_SHUTDOWN_GRACE_MS",
        default_value_t = 2_000,
        help = "Grace window for in-flight sends during shutdown."
    )]
    shutdown_grace_ms: u64,
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = RelayArgs::parse();
    let settings = DiscordSettings::from_env()?;

    let (bridge, queue_rx, bridge_shutdown_tx) = session_bridge(
        DEFAULT_SEND_QUEUE_DEPTH,
        Duration::from_millis(args.send_timeout_ms),
    );
    let (session_shutdown_tx, session_shutdown_rx) = tokio::sync::watch::channel(false);
    let session_config = DiscordSessionConfig {
        token: settings.token.clone(),
        api_base: args.discord_api_base.clone(),
        gateway_url: args.discord_gateway_url.clone(),
        request_timeout_ms: args.request_timeout_ms,
        reconnect_delay: Duration::from_millis(args.reconnect_delay_ms),
    };
    let (session_task, mut state_rx) =
        spawn_discord_session(session_config, queue_rx, session_shutdown_rx);

    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow();
            tracing::info!(state = state.as_str(), "discord session state changed");
        }
    });

    let shortener = UrlShortener::new(args.shortener_base.clone(), args.request_timeout_ms)?;
    let ingress_state = Arc::new(IngressState {
        destination: settings.destination(),
        shortener,
        submitter: Arc::new(bridge),
    });
    let router = build_ingress_router(ingress_state);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve ingress bound address")?;
    tracing::info!(addr = %local_addr, server = %settings.server_name, channel = %settings.channel_name, "webhook ingress listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("webhook ingress server exited unexpectedly")?;

    // Shutdown sequence: ingress has stopped accepting requests; reject new
    // bridge submissions, give in-flight sends the grace window, then take
    // the session connection down.
    tracing::info!("shutting down relay");
    bridge_shutdown_tx.send_replace(true);
    tokio::time::sleep(Duration::from_millis(args.shutdown_grace_ms)).await;
    session_shutdown_tx.send_replace(true);
    match tokio::time::timeout(Duration::from_millis(args.shutdown_grace_ms), session_task).await {
        Ok(joined) => joined.context("discord session task panicked")??,
        Err(_) => tracing::warn!("discord session did not stop within the grace window"),
    }
    Ok(())
}
