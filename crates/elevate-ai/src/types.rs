//! Request types for the chat backend

use crate::error::{Error, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Most files a single message may carry
pub const MAX_ATTACHMENTS: usize = 5;

/// Per-file size limit (10 MiB)
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Question sent when the user attaches files without typing anything
pub const ATTACHMENT_ONLY_PROMPT: &str = "Please analyze the attached file(s).";

/// MIME types the backend accepts
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
    "text/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Which agent flow handles the message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Conversational flow, streamed token by token
    #[default]
    Chat,
    /// Tool-using flow that answers with a single JSON reply
    Act,
}

impl ChatMode {
    pub fn name(&self) -> &'static str {
        match self {
            ChatMode::Chat => "chat",
            ChatMode::Act => "act",
        }
    }

    /// Whether the backend should stream this mode's reply
    pub fn is_streaming(&self) -> bool {
        matches!(self, ChatMode::Chat)
    }
}

impl std::fmt::Display for ChatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ChatMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(ChatMode::Chat),
            "act" => Ok(ChatMode::Act),
            other => Err(Error::InvalidConfig(format!(
                "unknown mode '{}', expected 'chat' or 'act'",
                other
            ))),
        }
    }
}

/// A file the user attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub display_name: String,
    /// Images are shown to the model directly; documents go through tools
    pub visible_to_model: bool,
}

impl Attachment {
    pub fn new(display_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        let mime_type = mime_type.into();
        Self {
            visible_to_model: mime_type.starts_with("image/"),
            data,
            mime_type,
            display_name: display_name.into(),
        }
    }

    /// Check size and type limits
    pub fn validate(&self) -> Result<()> {
        if self.data.len() > MAX_ATTACHMENT_BYTES {
            return Err(Error::Attachment(format!(
                "{} exceeds the maximum size of 10MB",
                self.display_name
            )));
        }
        if !ALLOWED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return Err(Error::Attachment(format!(
                "file type {} is not supported",
                self.mime_type
            )));
        }
        Ok(())
    }

    /// Encode as the backend's upload entry
    pub fn to_upload(&self) -> Upload {
        Upload {
            data: format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data)),
            kind: if self.visible_to_model {
                UploadKind::File
            } else {
                UploadKind::FullFile
            },
            name: self.display_name.clone(),
            mime: self.mime_type.clone(),
        }
    }
}

/// Validate a whole batch of attachments
pub fn validate_attachments(attachments: &[Attachment]) -> Result<()> {
    if attachments.len() > MAX_ATTACHMENTS {
        return Err(Error::Attachment(format!(
            "a maximum of {} files can be attached",
            MAX_ATTACHMENTS
        )));
    }
    attachments.iter().try_for_each(Attachment::validate)
}

/// Guess a supported MIME type from a file extension
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    };
    Some(mime)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadKind {
    #[serde(rename = "file")]
    File,
    #[serde(rename = "file:full")]
    FullFile,
}

/// Attachment as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    /// `data:<mime>;base64,<payload>` URI
    pub data: String,
    #[serde(rename = "type")]
    pub kind: UploadKind,
    pub name: String,
    pub mime: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverrideConfig {
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Body of a prediction request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub question: String,
    pub streaming: bool,
    #[serde(rename = "overrideConfig")]
    pub override_config: OverrideConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploads: Option<Vec<Upload>>,
    #[serde(skip)]
    pub mode: ChatMode,
}

impl ChatRequest {
    /// Build a request, validating attachments before any network I/O
    pub fn build(
        prompt: &str,
        attachments: &[Attachment],
        session_id: Option<&str>,
        mode: ChatMode,
    ) -> Result<Self> {
        validate_attachments(attachments)?;

        let prompt = prompt.trim();
        let question = if !prompt.is_empty() {
            prompt.to_string()
        } else if !attachments.is_empty() {
            ATTACHMENT_ONLY_PROMPT.to_string()
        } else {
            return Err(Error::InvalidRequest(
                "message must contain text or at least one attachment".into(),
            ));
        };

        let uploads = if attachments.is_empty() {
            None
        } else {
            Some(attachments.iter().map(Attachment::to_upload).collect())
        };

        Ok(Self {
            question,
            streaming: mode.is_streaming(),
            override_config: OverrideConfig {
                session_id: session_id.filter(|s| !s.is_empty()).map(str::to_string),
            },
            uploads,
            mode,
        })
    }

    pub fn session_id(&self) -> Option<&str> {
        self.override_config.session_id.as_deref()
    }
}
