//! Conversation title generation

use async_trait::async_trait;
use elevate_ai::providers::{Credentials, flowise::api_error_message};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{Error, Result};

/// Title used whenever generation fails or returns nothing useful
pub const DEFAULT_TITLE: &str = "New Chat";

const MAX_TITLE_CHARS: usize = 50;
const MIN_TITLE_CHARS: usize = 3;
const TITLE_TIMEOUT_SECS: u64 = 30;

/// Produces a short title from a conversation's first message
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Title endpoint that accepts `{prompt}` and answers `{title}`
pub struct HttpTitleGenerator {
    client: reqwest::Client,
    url: String,
    credentials: Credentials,
}

impl HttpTitleGenerator {
    pub fn new(url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TITLE_TIMEOUT_SECS))
            .build()
            .map_err(elevate_ai::Error::from)?;
        Ok(Self {
            client,
            url: url.into(),
            credentials,
        })
    }
}

#[derive(Deserialize)]
struct TitleResponse {
    title: Option<String>,
}

#[async_trait]
impl TitleGenerator for HttpTitleGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let builder = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "prompt": prompt }));
        let response = self
            .credentials
            .apply(builder)
            .send()
            .await
            .map_err(|e| Error::Title(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Title(format!(
                "{}: {}",
                status.as_u16(),
                api_error_message(&body)
            )));
        }

        let body: TitleResponse = response
            .json()
            .await
            .map_err(|e| Error::Title(e.to_string()))?;
        body.title
            .map(|t| clean_title(&t))
            .ok_or_else(|| Error::Title("response has no title".into()))
    }
}

/// Strip quotes and clamp length; unusable titles become [`DEFAULT_TITLE`]
pub fn clean_title(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| *c != '"' && *c != '\'').collect();
    let title = stripped.trim();

    let len = title.chars().count();
    if len < MIN_TITLE_CHARS {
        return DEFAULT_TITLE.to_string();
    }
    if len > MAX_TITLE_CHARS {
        let head: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        return format!("{}...", head);
    }
    title.to_string()
}

/// Generate a title, falling back to [`DEFAULT_TITLE`] on any failure
pub async fn title_or_default<G>(generator: &G, prompt: &str) -> String
where
    G: TitleGenerator + ?Sized,
{
    match generator.generate(prompt).await {
        Ok(title) => clean_title(&title),
        Err(e) => {
            tracing::warn!("Title generation failed: {}", e);
            DEFAULT_TITLE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl TitleGenerator for Fixed {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .map_err(|e| Error::Title(e.to_string()))
        }
    }

    #[test]
    fn test_clean_title_strips_quotes() {
        assert_eq!(clean_title("\"Rust Streaming Basics\""), "Rust Streaming Basics");
        assert_eq!(clean_title("  'Trip Plans'  "), "Trip Plans");
    }

    #[test]
    fn test_clean_title_truncates() {
        let long = "A".repeat(60);
        let cleaned = clean_title(&long);
        assert_eq!(cleaned.chars().count(), 50);
        assert!(cleaned.ends_with("..."));
        assert_eq!(clean_title(&"B".repeat(50)), "B".repeat(50));
    }

    #[test]
    fn test_clean_title_too_short() {
        assert_eq!(clean_title(""), DEFAULT_TITLE);
        assert_eq!(clean_title("\"ab\""), DEFAULT_TITLE);
        assert_eq!(clean_title("abc"), "abc");
    }

    #[test]
    fn test_clean_title_counts_chars_not_bytes() {
        let title = "é".repeat(55);
        let cleaned = clean_title(&title);
        assert_eq!(cleaned, format!("{}...", "é".repeat(47)));
    }

    #[tokio::test]
    async fn test_title_or_default() {
        assert_eq!(title_or_default(&Fixed(Ok("\"Budget Review\"")), "q").await, "Budget Review");
        assert_eq!(title_or_default(&Fixed(Ok("x")), "q").await, DEFAULT_TITLE);
        assert_eq!(title_or_default(&Fixed(Err("503")), "q").await, DEFAULT_TITLE);
    }
}
