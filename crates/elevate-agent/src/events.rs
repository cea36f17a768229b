//! Controller event types

use elevate_ai::CompletedMessage;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while a reply streams in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Render-ready markdown for everything received so far
    Snapshot { markdown: String },

    /// Full reasoning trace so far (not a delta)
    Thinking { trace: String },

    /// Reply finished
    Complete { message: CompletedMessage },

    /// Exchange failed; earlier snapshots stay valid
    Failed { message: String },
}

impl ChatEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Complete { .. } | ChatEvent::Failed { .. })
    }
}

/// A stream of controller events
pub type ChatEventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;
