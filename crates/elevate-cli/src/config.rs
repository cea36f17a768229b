//! Configuration file support

use elevate_ai::{
    ChatMode,
    providers::{Credentials, DEFAULT_TIMEOUT_SECS, FlowiseConfig},
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for elevate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prediction endpoint for chat mode
    pub chat_url: Option<String>,
    /// Prediction endpoint for act mode (defaults to chat_url)
    pub act_url: Option<String>,
    /// Title generation endpoint
    pub title_url: Option<String>,
    /// Endpoint that forgets an upstream session when a chat is deleted
    pub cleanup_url: Option<String>,
    /// Sent in the `apikey` header
    pub api_key: Option<String>,
    /// Sent as a bearer token
    pub access_token: Option<String>,
    /// Total time allowed for one reply, in seconds
    pub timeout_secs: Option<u64>,
    /// Whether to print the model's reasoning trace
    pub show_thinking: Option<bool>,
    /// Default mode (chat, act)
    pub mode: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("elevate")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("ELEVATE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            show_thinking: Some(true),
            mode: Some(ChatMode::Chat.name().to_string()),
            ..Default::default()
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn show_thinking(&self) -> bool {
        self.show_thinking.unwrap_or(true)
    }

    /// Configured default mode; unknown values fall back to chat
    pub fn mode(&self) -> ChatMode {
        match self.mode.as_deref().map(str::parse::<ChatMode>) {
            Some(Ok(mode)) => mode,
            Some(Err(e)) => {
                eprintln!("Warning: {}", e);
                ChatMode::default()
            }
            None => ChatMode::default(),
        }
    }

    /// Credentials from config, then ELEVATE_ACCESS_TOKEN / ELEVATE_API_KEY
    pub fn credentials(&self) -> Credentials {
        Credentials::resolve(self.access_token.as_deref(), self.api_key.as_deref())
    }

    /// Backend settings, or `None` if no chat endpoint is configured
    pub fn flowise_config(&self) -> Option<FlowiseConfig> {
        let chat_url = self.chat_url.clone().filter(|u| !u.trim().is_empty())?;
        Some(FlowiseConfig {
            chat_url,
            act_url: self.act_url.clone(),
            cleanup_url: self.cleanup_url.clone(),
            credentials: self.credentials(),
            timeout_secs: self.timeout_secs(),
        })
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# elevate configuration file
# Place at ~/.config/elevate/config.toml (Linux) or set ELEVATE_CONFIG_PATH

# Prediction endpoints
chat_url = "https://flowise.example.com/api/v1/prediction/<chatflow-id>"
# act_url = "https://flowise.example.com/api/v1/prediction/<agentflow-id>"

# Optional collaborators
# title_url = "https://api.example.com/functions/v1/generate-chat-title"
# cleanup_url = "https://api.example.com/functions/v1/delete-flowise-chat"

# Credentials (optional - can also use ELEVATE_ACCESS_TOKEN / ELEVATE_API_KEY)
# access_token = "..."
# api_key = "..."

# Seconds to wait for a complete reply
timeout_secs = 300

# Print the model's reasoning trace while it streams
show_thinking = true

# Default mode (chat, act)
mode = "chat"
"#
}
