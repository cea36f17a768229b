//! Server-sent event decoding for the chat backend's response stream.
//!
//! The upstream workflow engine wraps every fragment in a `data:` line whose
//! payload is usually a JSON envelope (`{"event":"token","data":"..."}`), but
//! older deployments send a flat `{"token":"...","sessionId":"..."}` object and
//! some nodes emit bare text. The decoder accepts all three shapes and never
//! fails: anything it cannot classify is skipped.

use crate::stream::{StreamEvent, StreamEventStream};
use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;

/// Sentinel some providers send after the last token
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder that turns raw response bytes into [`StreamEvent`]s.
///
/// Bytes are buffered until a full line is available, so a chunk may end
/// anywhere, including inside a multi-byte UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    current_event: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a transport chunk and return the events completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            process_line(&mut self.current_event, &self.buf[start..end], &mut events);
            start = end + 1;
        }
        self.buf.drain(..start);

        events
    }

    /// Flush a trailing line that never got its newline
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if !self.buf.is_empty() {
            let line = std::mem::take(&mut self.buf);
            process_line(&mut self.current_event, &line, &mut events);
        }
        events
    }

    /// Most recent `event:` name seen
    pub fn current_event(&self) -> Option<&str> {
        self.current_event.as_deref()
    }
}

fn process_line(current_event: &mut Option<String>, raw: &[u8], events: &mut Vec<StreamEvent>) {
    let text = String::from_utf8_lossy(raw);
    let line = text.strip_suffix('\r').unwrap_or(&text);

    // Blank separators and `:keepalive` style comments carry nothing
    if line.trim().is_empty() || line.starts_with(':') {
        return;
    }

    // Framing artifact emitted by the workflow engine
    if line == "message" || line == "message:" {
        return;
    }

    if let Some(name) = line.strip_prefix("event:") {
        *current_event = Some(name.trim().to_string());
        return;
    }

    if let Some(payload) = line.strip_prefix("data:") {
        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        classify_payload(payload, current_event.as_deref(), events);
        return;
    }

    tracing::debug!(line = %line, "skipping unrecognized SSE line");
}

/// JSON envelope carried by a `data:` line. Covers both the event-wrapped
/// format and the legacy flat format.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    token: Option<Value>,
    #[serde(default, rename = "sessionId")]
    session_id: Option<Value>,
}

/// How a `data:` payload was recognized
enum Payload {
    Envelope(Envelope),
    Raw,
}

fn parse_payload(payload: &str) -> Payload {
    match serde_json::from_str::<Value>(payload) {
        Ok(value @ Value::Object(_)) => match serde_json::from_value::<Envelope>(value) {
            Ok(envelope) => Payload::Envelope(envelope),
            Err(e) => {
                tracing::debug!(error = %e, "unexpected envelope field types");
                Payload::Envelope(Envelope::default())
            }
        },
        _ => Payload::Raw,
    }
}

fn classify_payload(payload: &str, context: Option<&str>, events: &mut Vec<StreamEvent>) {
    match parse_payload(payload) {
        Payload::Envelope(envelope) => classify_envelope(envelope, events),
        Payload::Raw => {
            let trimmed = payload.trim();
            if trimmed.is_empty() || trimmed == DONE_SENTINEL {
                return;
            }
            let text = payload.trim_end_matches(['\r', '\n']);
            events.push(match context {
                Some("thinking") => StreamEvent::thinking(text),
                Some("error") => StreamEvent::error(text),
                _ => StreamEvent::token(text),
            });
        }
    }
}

fn classify_envelope(envelope: Envelope, events: &mut Vec<StreamEvent>) {
    match envelope.event.as_deref() {
        Some("token") => {
            if let Some(text) = non_empty_str(envelope.data.as_ref()) {
                events.push(StreamEvent::token(text));
                return;
            }
        }
        Some("thinking") => {
            if let Some(text) = non_empty_str(envelope.data.as_ref()) {
                events.push(StreamEvent::thinking(text));
                return;
            }
        }
        Some("metadata") => {
            let id = envelope.data.as_ref().and_then(|data| {
                non_empty_str(data.get("sessionId")).or_else(|| non_empty_str(data.get("chatId")))
            });
            if let Some(id) = id {
                events.push(StreamEvent::metadata(id));
                return;
            }
        }
        Some("end") => {
            events.push(StreamEvent::End);
            return;
        }
        Some("error") => {
            let message = non_empty_str(envelope.data.as_ref())
                .map(str::to_string)
                .or_else(|| {
                    envelope
                        .data
                        .as_ref()
                        .and_then(|d| non_empty_str(d.get("message")))
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "Upstream error".to_string());
            events.push(StreamEvent::error(message));
            return;
        }
        Some(other) => {
            tracing::debug!(event = other, "ignoring envelope event");
        }
        None => {}
    }

    // Legacy flat format; both fields may appear on one line
    if let Some(token) = non_empty_str(envelope.token.as_ref()) {
        events.push(StreamEvent::token(token));
    }
    if let Some(id) = non_empty_str(envelope.session_id.as_ref()) {
        events.push(StreamEvent::metadata(id));
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Decode a byte stream into a stream of events.
///
/// Transport errors become a single `Error` event. Nothing is yielded after
/// the first terminal event; if the input ends without one, `End` is
/// synthesized.
pub fn decode_stream<S, B, E>(bytes: S) -> StreamEventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(stream! {
        let mut decoder = SseDecoder::new();
        let mut bytes = Box::pin(bytes);

        while let Some(chunk) = bytes.next().await {
            let events = match chunk {
                Ok(chunk) => decoder.feed(chunk.as_ref()),
                Err(e) => vec![StreamEvent::error(e.to_string())],
            };
            for event in events {
                let terminal = event.is_terminal();
                yield event;
                if terminal {
                    return;
                }
            }
        }

        for event in decoder.finish() {
            let terminal = event.is_terminal();
            yield event;
            if terminal {
                return;
            }
        }

        tracing::debug!("response stream ended without an end event");
        yield StreamEvent::End;
    })
}
