//! Stream session controller: drives one request/response exchange

use std::sync::Arc;

use async_stream::stream;
use elevate_ai::{AccumulatedMessage, Attachment, ChatMode, ChatRequest, CompletedMessage, StreamEvent};
use futures::StreamExt;

use crate::{
    error::Result,
    events::{ChatEvent, ChatEventStream},
    handle::ChatHandle,
    transport::Transport,
};

/// What the caller wants to send
#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
    /// Session to continue; `None` starts a new conversation
    pub prior_session_id: Option<String>,
    pub mode: ChatMode,
}

impl SendRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.prior_session_id = session_id;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Callback form of the controller's output
pub trait ChatObserver {
    fn on_snapshot(&mut self, _markdown: &str) {}
    fn on_thinking(&mut self, _trace: &str) {}
    fn on_complete(&mut self, _message: &CompletedMessage) {}
    fn on_error(&mut self, _message: &str) {}
}

/// Runs chat exchanges over a transport, one at a time
pub struct ChatController {
    transport: Arc<dyn Transport>,
    handle: ChatHandle,
}

impl ChatController {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            handle: ChatHandle::new(),
        }
    }

    /// Get a cloneable handle for aborting from another task
    pub fn handle(&self) -> ChatHandle {
        self.handle.clone()
    }

    /// Abort the current send
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Start a send and return its event stream.
    ///
    /// Request problems (no text and no files, rejected attachments) and a
    /// send already in flight are returned as errors. Everything after that,
    /// including failure to connect, arrives as exactly one terminal event on
    /// the stream unless the send is aborted, in which case the stream just
    /// ends. The send stays in flight until the stream is drained or dropped.
    pub fn send(&self, request: SendRequest) -> Result<ChatEventStream> {
        let chat_request = ChatRequest::build(
            &request.prompt,
            &request.attachments,
            request.prior_session_id.as_deref(),
            request.mode,
        )?;
        let (guard, cancel) = self.handle.begin()?;

        let transport = Arc::clone(&self.transport);
        let prior_session_id = request.prior_session_id;

        let events: ChatEventStream = Box::pin(stream! {
            let _guard = guard;

            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("send aborted before the stream opened");
                    return;
                }
                result = transport.open(chat_request, cancel.clone()) => result,
            };

            let mut upstream = match opened {
                Ok(upstream) => upstream,
                Err(e) => {
                    if cancel.is_cancelled() {
                        return;
                    }
                    tracing::debug!(error = %e, "failed to open response stream");
                    yield ChatEvent::Failed { message: e.to_string() };
                    return;
                }
            };

            let mut message = AccumulatedMessage::new(prior_session_id);

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!("send aborted mid-stream");
                        return;
                    }
                    next = upstream.next() => next,
                };

                if cancel.is_cancelled() {
                    return;
                }

                match next {
                    Some(StreamEvent::Token { text }) => {
                        message.push_token(&text);
                        yield ChatEvent::Snapshot { markdown: message.snapshot() };
                    }
                    Some(StreamEvent::Thinking { text }) => {
                        message.push_thinking(&text);
                        yield ChatEvent::Thinking { trace: message.thinking().to_string() };
                    }
                    Some(StreamEvent::Metadata { session_id }) => {
                        message.set_session_id(session_id);
                    }
                    Some(StreamEvent::Error { message: error }) => {
                        yield ChatEvent::Failed { message: error };
                        return;
                    }
                    Some(StreamEvent::End) | None => {
                        let completed = message.finalize();
                        tracing::debug!(
                            chars = completed.content.len(),
                            has_thinking = completed.thinking.is_some(),
                            has_session = completed.session_id.is_some(),
                            "reply complete"
                        );
                        yield ChatEvent::Complete { message: completed };
                        return;
                    }
                }
            }
        });

        Ok(events)
    }

    /// Run a send to completion, reporting through an observer.
    ///
    /// Returns the completed message, or `None` if the exchange failed or was
    /// aborted.
    pub async fn send_with<O>(&self, request: SendRequest, observer: &mut O) -> Result<Option<CompletedMessage>>
    where
        O: ChatObserver + ?Sized,
    {
        let mut events = self.send(request)?;
        let mut completed = None;

        while let Some(event) = events.next().await {
            match event {
                ChatEvent::Snapshot { markdown } => observer.on_snapshot(&markdown),
                ChatEvent::Thinking { trace } => observer.on_thinking(&trace),
                ChatEvent::Complete { message } => {
                    observer.on_complete(&message);
                    completed = Some(message);
                }
                ChatEvent::Failed { message } => observer.on_error(&message),
            }
        }

        Ok(completed)
    }
}
