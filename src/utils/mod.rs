//! Utility functions.
//!
//! Collection of helper functions used across the bot.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span};

/// Escape text for Telegram HTML parse mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// HTML mention link for a user.
pub fn mention_html(user_id: u64, name: &str) -> String {
    format!("<a href=\"tg://user?id={}\">{}</a>", user_id, html_escape(name))
}

/// Spawn a detached task tagged with `op`.
///
/// Everything the task logs carries a `background{op=...}` span, so failures
/// reported inside it stay attributable after the caller has moved on.
pub fn spawn_background<F>(op: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(
        async move {
            task.await;
            debug!("background task finished");
        }
        .instrument(info_span!("background", op)),
    )
}
