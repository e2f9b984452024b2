//! Link-shortener client with a documented fallback policy.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};

const SHORTENER_USER_AGENT: &str = "hook-relay";

#[derive(Clone)]
/// Client for a git.io-style shortener: POST the long URL as form data and
/// read the shortened target from the `Location` response header.
pub struct UrlShortener {
    http: reqwest::Client,
    api_base: String,
}

impl UrlShortener {
    pub fn new(api_base: String, request_timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(SHORTENER_USER_AGENT)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("failed to create url shortener client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Shortens `url`, falling back to the original on any failure. A degraded
    /// shortener must never cost the relay a message line.
    pub async fn shorten_or_original(&self, url: &str) -> String {
        match self.shorten(url).await {
            Ok(short) => short,
            Err(error) => {
                tracing::warn!(url, %error, "url shortener failed, using original url");
                url.to_string()
            }
        }
    }

    async fn shorten(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.api_base)
            .form(&[("url", url)])
            .send()
            .await
            .context("shortener request failed")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("shortener returned status {status}"));
        }
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow!("shortener response missing Location header"))?;
        Ok(location.to_string())
    }
}
