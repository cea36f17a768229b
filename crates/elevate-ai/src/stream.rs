//! Streaming event types and message accumulation

use crate::render_snapshot;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events decoded from the backend's response stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Content fragment for the visible message
    Token { text: String },
    /// Fragment of the reasoning trace
    Thinking { text: String },
    /// Conversation correlation id
    Metadata { session_id: String },
    /// Stream finished
    End,
    /// Transport or upstream failure
    Error { message: String },
}

impl StreamEvent {
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token { text: text.into() }
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        Self::Thinking { text: text.into() }
    }

    pub fn metadata(session_id: impl Into<String>) -> Self {
        Self::Metadata {
            session_id: session_id.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Check if this is a terminal event (End or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::End | StreamEvent::Error { .. })
    }
}

/// A stream of decoded events
pub type StreamEventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// The message being built during one exchange.
///
/// Append-only: tokens and thinking fragments are concatenated in arrival
/// order, and the session id keeps the last value observed.
#[derive(Debug, Default, Clone)]
pub struct AccumulatedMessage {
    visible: String,
    thinking: String,
    session_id: Option<String>,
}

impl AccumulatedMessage {
    /// Start an empty message, remembering the caller's prior session id
    pub fn new(prior_session_id: Option<String>) -> Self {
        Self {
            session_id: prior_session_id,
            ..Default::default()
        }
    }

    pub fn push_token(&mut self, text: &str) {
        self.visible.push_str(text);
    }

    pub fn push_thinking(&mut self, text: &str) {
        self.thinking.push_str(text);
    }

    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    /// Raw concatenation of all tokens so far
    pub fn visible(&self) -> &str {
        &self.visible
    }

    /// Full reasoning trace so far
    pub fn thinking(&self) -> &str {
        &self.thinking
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Render-ready markdown for the current visible buffer
    pub fn snapshot(&self) -> String {
        render_snapshot(&self.visible)
    }

    /// Freeze the message once the stream has ended
    pub fn finalize(self) -> CompletedMessage {
        let rendered = render_snapshot(&self.visible);
        CompletedMessage {
            content: self.visible,
            rendered,
            thinking: if self.thinking.is_empty() {
                None
            } else {
                Some(self.thinking)
            },
            session_id: self.session_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// An assistant reply that finished streaming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedMessage {
    /// Raw text as received
    pub content: String,
    /// Formatted and repaired markdown
    pub rendered: String,
    /// Reasoning trace, if the backend sent one
    pub thinking: Option<String>,
    /// Session id to continue the conversation with
    pub session_id: Option<String>,
    pub timestamp: i64,
}
