//! elevate-ai: streaming chat protocol
//!
//! Decodes the chat backend's server-sent event stream into typed events, and
//! turns the growing reply text into markdown that is safe to render at any
//! point mid-stream.

pub mod error;
pub mod format;
pub mod providers;
pub mod repair;
pub mod sse;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use format::format_content;
pub use repair::repair_markdown;
pub use sse::{SseDecoder, decode_stream};
pub use stream::{AccumulatedMessage, CompletedMessage, StreamEvent, StreamEventStream};
pub use types::*;

/// Render-ready markdown for a (possibly truncated) reply buffer
pub fn render_snapshot(text: &str) -> String {
    repair_markdown(&format_content(text))
}
