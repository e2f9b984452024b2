//! Pure rendering of webhook payloads into chat messages.
//!
//! The renderers are stateless: one decoded payload in, one formatted message
//! (or an explicit unhandled outcome) out. The only side effect is the
//! per-commit URL-shortening call, which degrades to the original URL rather
//! than failing the render.

pub mod render_dispatch;
pub mod render_github;
pub mod render_unity;
pub mod url_shortener;

pub use render_dispatch::{render_event, GithubEventKind, UnityBuildEventKind};
pub use url_shortener::UrlShortener;
