//! Webhook routes and the hook-handling pipeline.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use relay_core::{RenderOutcome, SessionSendError, WebhookEvent, WebhookProvider};
use relay_render::{render_event, UrlShortener};
use relay_session::SendSubmitter;
use serde_json::{json, Value};

pub const GITHUB_EVENT_HEADER: &str = "x-github-event";
pub const UNITY_BUILD_EVENT_HEADER: &str = "x-unitycloudbuild-event";

/// Shared ingress dependencies: the fixed destination, the shortener used
/// during rendering, and the bridge seam into the session connection.
pub struct IngressState {
    pub destination: relay_core::ChannelRef,
    pub shortener: UrlShortener,
    pub submitter: Arc<dyn SendSubmitter>,
}

pub fn build_ingress_router(state: Arc<IngressState>) -> Router {
    Router::new()
        .route("/gh-hook", post(handle_github_hook))
        .route("/ucb-hook", post(handle_unity_hook))
        .route("/healthz", get(handle_health))
        .with_state(state)
}

async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status":"ok"})))
}

async fn handle_github_hook(
    State(state): State<Arc<IngressState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    handle_provider_hook(
        state,
        WebhookProvider::Github,
        GITHUB_EVENT_HEADER,
        &headers,
        &body,
    )
    .await
}

async fn handle_unity_hook(
    State(state): State<Arc<IngressState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    handle_provider_hook(
        state,
        WebhookProvider::UnityCloudBuild,
        UNITY_BUILD_EVENT_HEADER,
        &headers,
        &body,
    )
    .await
}

async fn handle_provider_hook(
    state: Arc<IngressState>,
    provider: WebhookProvider,
    event_header: &str,
    headers: &HeaderMap,
    body: &str,
) -> Response {
    let provider_label = provider.as_str();
    let Some(event_type) = headers
        .get(event_header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        tracing::info!(provider = provider_label, "webhook missing event-type header, ignoring");
        return empty_ok();
    };

    let payload: Value = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(
                provider = provider_label,
                event_type,
                %error,
                "webhook body is not valid json, ignoring"
            );
            return empty_ok();
        }
    };

    let event = WebhookEvent::new(provider, event_type, payload);
    let message = match render_event(&event, &state.destination, &state.shortener).await {
        Ok(RenderOutcome::Rendered(message)) => message,
        Ok(RenderOutcome::Unhandled) => {
            tracing::info!(
                provider = provider_label,
                event_type = %event.event_type,
                "unhandled webhook event type"
            );
            return empty_ok();
        }
        Err(error) => {
            tracing::warn!(
                provider = provider_label,
                event_type = %event.event_type,
                %error,
                "webhook payload failed to render, ignoring"
            );
            return empty_ok();
        }
    };

    match state.submitter.submit_send(message).await {
        Ok(receipt) => {
            tracing::info!(
                provider = provider_label,
                event_type = %event.event_type,
                message_id = %receipt.message_id,
                channel_id = %receipt.channel_id,
                "webhook relayed"
            );
            empty_ok()
        }
        Err(error) if error.is_relay_fault() => {
            tracing::error!(
                provider = provider_label,
                event_type = %event.event_type,
                %error,
                "relay failed to deliver webhook message"
            );
            let status = match error {
                SessionSendError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(json!({"error": {"code": "relay_failure", "message": error.to_string()}})),
            )
                .into_response()
        }
        Err(error) => {
            // Delivery-state conditions the webhook sender cannot act on;
            // retrying the delivery would only duplicate the event.
            tracing::warn!(
                provider = provider_label,
                event_type = %event.event_type,
                %error,
                "webhook message not delivered"
            );
            empty_ok()
        }
    }
}

fn empty_ok() -> Response {
    (StatusCode::OK, String::new()).into_response()
}

#[cfg(test)]
mod tests;
