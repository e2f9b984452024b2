//! Event-type routing from (provider, event-type tag) to a renderer.
//!
//! Known event kinds are tagged enums so the dispatch match is exhaustive;
//! unknown tags for a recognized provider are an explicit `Unhandled` outcome,
//! not an error.

use relay_core::{ChannelRef, RenderError, RenderOutcome, WebhookEvent, WebhookProvider};

use crate::render_github::render_github_push;
use crate::render_unity::render_unity_build_status;
use crate::url_shortener::UrlShortener;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// GitHub event-type tags the relay renders.
pub enum GithubEventKind {
    Push,
}

impl GithubEventKind {
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "push" => Some(Self::Push),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Unity Cloud Build event-type tags the relay renders.
pub enum UnityBuildEventKind {
    BuildSuccess,
    BuildFailure,
    BuildCanceled,
}

impl UnityBuildEventKind {
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "ProjectBuildSuccess" => Some(Self::BuildSuccess),
            "ProjectBuildFailure" => Some(Self::BuildFailure),
            "ProjectBuildCanceled" => Some(Self::BuildCanceled),
            _ => None,
        }
    }

    pub fn status_label(self) -> &'static str {
        match self {
            Self::BuildSuccess => "succeeded",
            Self::BuildFailure => "failed",
            Self::BuildCanceled => "canceled",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::BuildSuccess => "\u{2611}",
            Self::BuildFailure => "\u{2612}",
            Self::BuildCanceled => "\u{00a9}",
        }
    }
}

/// Renders one webhook event into a chat message, or reports it unhandled.
/// The shortener is only consulted for event kinds that carry per-record URLs.
pub async fn render_event(
    event: &WebhookEvent,
    destination: &ChannelRef,
    shortener: &UrlShortener,
) -> Result<RenderOutcome, RenderError> {
    match event.provider {
        WebhookProvider::Github => match GithubEventKind::from_event_type(&event.event_type) {
            Some(GithubEventKind::Push) => {
                render_github_push(&event.raw_payload, destination, shortener)
                    .await
                    .map(RenderOutcome::Rendered)
            }
            None => Ok(RenderOutcome::Unhandled),
        },
        WebhookProvider::UnityCloudBuild => {
            match UnityBuildEventKind::from_event_type(&event.event_type) {
                Some(kind) => render_unity_build_status(kind, &event.raw_payload, destination)
                    .map(RenderOutcome::Rendered),
                None => Ok(RenderOutcome::Unhandled),
            }
        }
    }
}
