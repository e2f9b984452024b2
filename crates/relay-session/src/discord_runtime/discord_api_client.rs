//! Discord REST client used by the session task to post channel messages.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use relay_core::SendReceipt;
use serde::Deserialize;
use serde_json::json;

const API_USER_AGENT: &str = "hook-relay";
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    id: String,
    channel_id: String,
}

#[derive(Clone)]
pub(super) struct DiscordApiClient {
    http: reqwest::Client,
    api_base: String,
}

impl DiscordApiClient {
    pub(super) fn new(api_base: String, token: String, request_timeout_ms: u64) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bot {}", token.trim()))
            .context("discord token is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .user_agent(API_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create discord api client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub(super) async fn create_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<SendReceipt> {
        let response = self
            .http
            .post(format!("{}/channels/{channel_id}/messages", self.api_base))
            .json(&json!({ "content": content }))
            .send()
            .await
            .context("discord create-message request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "discord create-message returned status {status}: {}",
                truncate_for_error(&body)
            ));
        }

        let posted: CreateMessageResponse = response
            .json()
            .await
            .context("failed to parse discord create-message response")?;
        Ok(SendReceipt {
            channel_id: posted.channel_id,
            message_id: posted.id,
        })
    }
}

fn truncate_for_error(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("{truncated}…")
}
