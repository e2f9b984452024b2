//! GitHub push-event rendering.

use relay_core::{ChannelRef, RenderError, RenderedMessage};
use serde_json::Value;

use crate::url_shortener::UrlShortener;

/// Renders a `push` payload into one summary line plus one line per commit,
/// preserving the payload's commit order.
pub async fn render_github_push(
    payload: &Value,
    destination: &ChannelRef,
    shortener: &UrlShortener,
) -> Result<RenderedMessage, RenderError> {
    let repo = required_str(payload, "/repository/full_name")?;
    let git_ref = required_str(payload, "/ref")?;
    let branch = git_ref.rsplit('/').next().unwrap_or(git_ref);
    let commits = payload
        .pointer("/commits")
        .and_then(Value::as_array)
        .ok_or_else(|| RenderError::missing_field("commits"))?;

    let noun = if commits.len() == 1 { "commit" } else { "commits" };
    let mut text = format!(
        "[**{repo}**][*{branch}*] {count} new {noun}:",
        count = commits.len()
    );

    for commit in commits {
        let id = required_str(commit, "/id")?;
        let message = required_str(commit, "/message")?;
        let author = required_str(commit, "/author/name")?;
        let url = required_str(commit, "/url")?;

        let short_id: String = id.chars().take(7).collect();
        let description = message.lines().next().unwrap_or("");
        let short_url = shortener.shorten_or_original(url).await;
        text.push_str(&format!(
            "\n{short_url}: {short_id} \u{21aa} {description} \u{21ac} {branch} \u{21af} {author}"
        ));
    }

    Ok(RenderedMessage {
        text,
        destination: destination.clone(),
    })
}

pub(crate) fn required_str<'a>(value: &'a Value, pointer: &str) -> Result<&'a str, RenderError> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| RenderError::missing_field(pointer.trim_start_matches('/')))
}
