//! Unity Cloud Build status rendering.
//!
//! The upstream template this replaces supplied formatter keys that did not
//! match its own placeholders, so its exact output is unreproducible; this is
//! the self-consistent reconstruction of what it evidently meant to say.

use relay_core::{ChannelRef, RenderError, RenderedMessage};
use serde_json::Value;

use crate::render_dispatch::UnityBuildEventKind;
use crate::render_github::required_str;

pub fn render_unity_build_status(
    kind: UnityBuildEventKind,
    payload: &Value,
    destination: &ChannelRef,
) -> Result<RenderedMessage, RenderError> {
    let project = required_str(payload, "/projectName")?;
    let target = required_str(payload, "/build_target")?;
    let build_number = payload
        .pointer("/buildNumber")
        .and_then(Value::as_u64)
        .ok_or_else(|| RenderError::missing_field("buildNumber"))?;

    let text = format!(
        "{glyph} [**{project}**] Build #{build_number} (target: {target}) {status}",
        glyph = kind.glyph(),
        status = kind.status_label(),
    );

    Ok(RenderedMessage {
        text,
        destination: destination.clone(),
    })
}
