//! Chat backend implementations

pub mod flowise;

pub use flowise::{DEFAULT_TIMEOUT_SECS, FlowiseConfig, FlowiseProvider};

use crate::{ChatRequest, Result, StreamEventStream};
use async_trait::async_trait;

/// Trait for chat backends
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send one message and stream the reply's events
    async fn stream(&self, request: &ChatRequest) -> Result<StreamEventStream>;
}

/// Auth material attached to every backend request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Sent as a bearer token
    pub access_token: Option<String>,
    /// Sent in the `apikey` header
    pub api_key: Option<String>,
}

impl Credentials {
    /// Resolve credentials, falling back to environment variables
    pub fn resolve(access_token: Option<&str>, api_key: Option<&str>) -> Self {
        Self {
            access_token: get_credential(access_token, "ELEVATE_ACCESS_TOKEN"),
            api_key: get_credential(api_key, "ELEVATE_API_KEY"),
        }
    }

    pub fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        match &self.api_key {
            Some(key) => builder.header("apikey", key),
            None => builder,
        }
    }
}

/// Get a credential from the provided value or the environment
pub fn get_credential(provided: Option<&str>, env_var: &str) -> Option<String> {
    if let Some(value) = provided.filter(|v| !v.is_empty()) {
        return Some(value.to_string());
    }
    std::env::var(env_var).ok().filter(|v| !v.is_empty())
}
