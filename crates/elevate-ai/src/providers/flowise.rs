//! Flowise prediction API provider

use super::{ChatProvider, Credentials};
use crate::{
    error::{Error, Result},
    sse::decode_stream,
    stream::{StreamEvent, StreamEventStream},
    types::{ChatMode, ChatRequest},
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;

/// Total time allowed for one exchange, matching the backend's own limit
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Endpoints and auth for a Flowise deployment
#[derive(Debug, Clone)]
pub struct FlowiseConfig {
    /// Prediction endpoint for chat mode
    pub chat_url: String,
    /// Prediction endpoint for act mode; falls back to `chat_url`
    pub act_url: Option<String>,
    /// Endpoint that forgets an upstream session
    pub cleanup_url: Option<String>,
    pub credentials: Credentials,
    pub timeout_secs: u64,
}

impl FlowiseConfig {
    pub fn new(chat_url: impl Into<String>) -> Self {
        Self {
            chat_url: chat_url.into(),
            act_url: None,
            cleanup_url: None,
            credentials: Credentials::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Endpoint serving the given mode
    pub fn endpoint(&self, mode: ChatMode) -> &str {
        match mode {
            ChatMode::Chat => &self.chat_url,
            ChatMode::Act => self.act_url.as_deref().unwrap_or(&self.chat_url),
        }
    }
}

/// Flowise API client
pub struct FlowiseProvider {
    client: reqwest::Client,
    config: FlowiseConfig,
}

impl FlowiseProvider {
    pub fn new(config: FlowiseConfig) -> Result<Self> {
        if config.chat_url.trim().is_empty() {
            return Err(Error::InvalidConfig("chat_url is not set".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FlowiseConfig {
        &self.config
    }

    /// Send a prediction request and stream the reply
    pub async fn stream(&self, request: &ChatRequest) -> Result<StreamEventStream> {
        let url = self.config.endpoint(request.mode);
        let timeout_secs = self.config.timeout_secs;

        tracing::debug!(
            url,
            mode = %request.mode,
            has_session = request.session_id().is_some(),
            uploads = request.uploads.as_ref().map_or(0, Vec::len),
            "sending prediction request"
        );

        let builder = self.client.post(url).json(request);
        let response = self
            .config
            .credentials
            .apply(builder)
            .send()
            .await
            .map_err(|e| Error::from_transport(e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), api_error_message(&body)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        tracing::debug!(status = status.as_u16(), content_type = %content_type, "prediction response");

        if content_type.contains("text/event-stream") {
            let bytes = response
                .bytes_stream()
                .map(move |chunk| chunk.map_err(|e| Error::from_transport(e, timeout_secs)));
            return Ok(decode_stream(bytes));
        }

        if content_type.contains("application/json") {
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::from_transport(e, timeout_secs))?;
            let events = json_reply_events(&body)?;
            return Ok(Box::pin(futures::stream::iter(events)));
        }

        Err(Error::UnexpectedContentType(if content_type.is_empty() {
            "<missing>".to_string()
        } else {
            content_type
        }))
    }

    /// Ask the backend to forget a conversation
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let Some(url) = self.config.cleanup_url.as_deref() else {
            tracing::debug!("no cleanup endpoint configured, skipping upstream delete");
            return Ok(());
        };

        let builder = self
            .client
            .post(url)
            .json(&serde_json::json!({ "sessionId": session_id }));
        let response = self
            .config
            .credentials
            .apply(builder)
            .send()
            .await
            .map_err(|e| Error::from_transport(e, self.config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), api_error_message(&body)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatProvider for FlowiseProvider {
    async fn stream(&self, request: &ChatRequest) -> Result<StreamEventStream> {
        FlowiseProvider::stream(self, request).await
    }
}

/// Error text from a failed response: the `error` field if the body is JSON,
/// otherwise the body itself
pub fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Non-streaming reply
#[derive(Debug, Deserialize)]
struct JsonReply {
    #[serde(default, alias = "text")]
    response: Option<String>,
    #[serde(default, rename = "sessionId")]
    session_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Convert a complete JSON reply into the events a stream would have produced
pub fn json_reply_events(body: &[u8]) -> Result<Vec<StreamEvent>> {
    let reply: JsonReply = serde_json::from_slice(body)?;

    let Some(text) = reply.response.filter(|t| !t.is_empty()) else {
        return Err(Error::UnexpectedResponse(
            reply
                .error
                .unwrap_or_else(|| "JSON reply has no response text".to_string()),
        ));
    };

    let mut events = vec![StreamEvent::token(text)];
    if let Some(id) = reply.session_id.filter(|id| !id.is_empty()) {
        events.push(StreamEvent::metadata(id));
    }
    events.push(StreamEvent::End);
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_per_mode() {
        let mut config = FlowiseConfig::new("https://flow.example/chat");
        assert_eq!(config.endpoint(ChatMode::Act), "https://flow.example/chat");
        config.act_url = Some("https://flow.example/act".into());
        assert_eq!(config.endpoint(ChatMode::Act), "https://flow.example/act");
        assert_eq!(config.endpoint(ChatMode::Chat), "https://flow.example/chat");
    }

    #[test]
    fn test_missing_chat_url_rejected() {
        assert!(matches!(
            FlowiseProvider::new(FlowiseConfig::new("  ")),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_api_error_message() {
        assert_eq!(api_error_message(r#"{"error":"Invalid JWT"}"#), "Invalid JWT");
        assert_eq!(api_error_message("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(api_error_message(""), "empty response body");
        assert_eq!(api_error_message(r#"{"message":"x"}"#), r#"{"message":"x"}"#);
    }

    #[test]
    fn test_json_reply_events() {
        let events = json_reply_events(br#"{"response":"All done","sessionId":"abc"}"#).unwrap();
        assert_eq!(
            events,
            vec![
                StreamEvent::token("All done"),
                StreamEvent::metadata("abc"),
                StreamEvent::End,
            ]
        );

        let events = json_reply_events(br#"{"text":"Hi"}"#).unwrap();
        assert_eq!(events, vec![StreamEvent::token("Hi"), StreamEvent::End]);
    }

    #[test]
    fn test_json_reply_without_response_is_error() {
        assert!(matches!(
            json_reply_events(br#"{"sessionId":"abc"}"#),
            Err(Error::UnexpectedResponse(_))
        ));
        let err = json_reply_events(br#"{"error":"flow crashed"}"#).unwrap_err();
        assert!(err.to_string().contains("flow crashed"));
        assert!(matches!(json_reply_events(b"not json"), Err(Error::Json(_))));
    }

    mod http {
        use super::super::{FlowiseConfig, FlowiseProvider};
        use crate::error::Error;
        use crate::providers::Credentials;
        use crate::stream::StreamEvent;
        use crate::types::{ChatMode, ChatRequest};
        use futures::StreamExt;
        use std::time::Duration;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};
        use tokio::task::JoinHandle;

        /// Read one request: headers plus a Content-Length body
        async fn read_request(socket: &mut TcpStream) -> String {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.trim()
                                .eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }
            String::from_utf8_lossy(&buf).into_owned()
        }

        fn response(status: &str, content_type: &str, body: &str) -> String {
            format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                content_type,
                body.len(),
                body
            )
        }

        /// Answer one connection with `reply`, then hold it open for `stall_secs`.
        /// Resolves to the raw request the server received.
        async fn serve(reply: String, stall_secs: u64) -> (String, JoinHandle<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let server = tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
                if stall_secs > 0 {
                    tokio::time::sleep(Duration::from_secs(stall_secs)).await;
                }
                let _ = socket.shutdown().await;
                request
            });
            (format!("http://{}/api/v1/prediction/flow", addr), server)
        }

        fn provider(url: String, timeout_secs: u64) -> FlowiseProvider {
            let mut config = FlowiseConfig::new(url);
            config.timeout_secs = timeout_secs;
            config.credentials = Credentials {
                access_token: Some("tok".into()),
                api_key: Some("key".into()),
            };
            FlowiseProvider::new(config).unwrap()
        }

        fn request() -> ChatRequest {
            ChatRequest::build("hi", &[], Some("sess-1"), ChatMode::Chat).unwrap()
        }

        async fn collect(provider: &FlowiseProvider) -> Vec<StreamEvent> {
            match provider.stream(&request()).await {
                Ok(events) => events.collect().await,
                Err(e) => panic!("stream failed to open: {}", e),
            }
        }

        #[tokio::test]
        async fn test_unauthorized_maps_to_api_error() {
            let body = r#"{"error":"Invalid JWT"}"#;
            let (url, server) = serve(response("401 Unauthorized", "application/json", body), 0).await;

            let Err(err) = provider(url, 5).stream(&request()).await else {
                panic!("expected an error");
            };
            match err {
                Error::Api { status, message } => {
                    assert_eq!(status, 401);
                    assert_eq!(message, "Invalid JWT");
                }
                other => panic!("unexpected error: {}", other),
            }

            let sent = server.await.unwrap();
            let lower = sent.to_lowercase();
            assert!(lower.contains("authorization: bearer tok"));
            assert!(lower.contains("apikey: key"));
            assert!(sent.contains(r#""question":"hi""#));
            assert!(sent.contains(r#""streaming":true"#));
            assert!(sent.contains(r#""sessionId":"sess-1""#));
        }

        #[tokio::test]
        async fn test_unexpected_content_type() {
            let (url, _server) = serve(response("200 OK", "text/html", "<html></html>"), 0).await;

            let Err(err) = provider(url, 5).stream(&request()).await else {
                panic!("expected an error");
            };
            assert!(matches!(err, Error::UnexpectedContentType(ref ct) if ct.contains("text/html")));
        }

        #[tokio::test]
        async fn test_event_stream_body_is_decoded() {
            let body = concat!(
                "data: {\"event\":\"token\",\"data\":\"Hel\"}\n\n",
                ":keepalive\n\n",
                "data: {\"event\":\"token\",\"data\":\"lo\"}\n\n",
                "data: {\"event\":\"metadata\",\"data\":{\"sessionId\":\"s2\"}}\n\n",
                "data: {\"event\":\"end\",\"data\":\"[DONE]\"}\n\n",
            );
            let (url, _server) = serve(response("200 OK", "text/event-stream", body), 0).await;

            assert_eq!(
                collect(&provider(url, 5)).await,
                vec![
                    StreamEvent::token("Hel"),
                    StreamEvent::token("lo"),
                    StreamEvent::metadata("s2"),
                    StreamEvent::End,
                ]
            );
        }

        #[tokio::test]
        async fn test_json_body_is_converted() {
            let body = r#"{"text":"Hi there","sessionId":"s3"}"#;
            let (url, _server) =
                serve(response("200 OK", "application/json; charset=utf-8", body), 0).await;

            assert_eq!(
                collect(&provider(url, 5)).await,
                vec![
                    StreamEvent::token("Hi there"),
                    StreamEvent::metadata("s3"),
                    StreamEvent::End,
                ]
            );
        }

        #[tokio::test]
        async fn test_stalled_server_times_out() {
            let (url, _server) = serve(String::new(), 10).await;

            let Err(err) = provider(url, 1).stream(&request()).await else {
                panic!("expected a timeout");
            };
            assert!(err.is_timeout());
            assert!(matches!(err, Error::Timeout(_)));
            assert!(err.to_string().contains("timed out"));
        }

        #[tokio::test]
        async fn test_stall_mid_stream_ends_with_timeout_event() {
            let reply = concat!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n",
                "data: {\"event\":\"token\",\"data\":\"A\"}\n\n",
            );
            let (url, _server) = serve(reply.to_string(), 10).await;

            let events = collect(&provider(url, 1)).await;
            assert_eq!(events.len(), 2);
            assert_eq!(events[0], StreamEvent::token("A"));
            match &events[1] {
                StreamEvent::Error { message } => assert!(message.contains("timed out")),
                other => panic!("expected a timeout error, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_delete_session_posts_session_id() {
            let (url, server) = serve(response("200 OK", "application/json", "{}"), 0).await;
            let mut config = FlowiseConfig::new("http://127.0.0.1:9/unused");
            config.cleanup_url = Some(url);
            let provider = FlowiseProvider::new(config).unwrap();

            provider.delete_session("sess-9").await.unwrap();
            assert!(server.await.unwrap().contains(r#"{"sessionId":"sess-9"}"#));
        }

        #[tokio::test]
        async fn test_delete_session_without_endpoint_is_noop() {
            let provider = FlowiseProvider::new(FlowiseConfig::new("http://127.0.0.1:9/unused")).unwrap();
            provider.delete_session("sess-9").await.unwrap();
        }
    }
}
