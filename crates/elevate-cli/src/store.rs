//! Chat history persisted as one JSONL file per conversation

use elevate_agent::DEFAULT_TITLE;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Who wrote a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Chat entry types for JSONL format.
///
/// Title and session entries are appended on change; the last one wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEntry {
    Metadata {
        id: String,
        created_at: i64,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    Message {
        role: Role,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thinking: Option<String>,
        timestamp: i64,
    },
    Title {
        title: String,
        timestamp: i64,
    },
    Session {
        session_id: String,
        timestamp: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    pub thinking: Option<String>,
    pub timestamp: i64,
}

/// Summary of a stored chat
#[derive(Debug, Clone)]
pub struct ChatInfo {
    pub id: String,
    pub created_at: i64,
    pub title: String,
    pub message_count: usize,
}

impl ChatInfo {
    pub fn created_at_display(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.created_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// State folded from a chat file
#[derive(Debug, Default)]
struct ChatState {
    id: String,
    created_at: i64,
    title: String,
    session_id: Option<String>,
    messages: Vec<StoredMessage>,
}

impl ChatState {
    fn apply(&mut self, entry: ChatEntry) {
        match entry {
            ChatEntry::Metadata {
                id,
                created_at,
                title,
                session_id,
            } => {
                self.id = id;
                self.created_at = created_at;
                self.title = title;
                self.session_id = session_id;
            }
            ChatEntry::Message {
                role,
                content,
                thinking,
                timestamp,
            } => self.messages.push(StoredMessage {
                role,
                content,
                thinking,
                timestamp,
            }),
            ChatEntry::Title { title, .. } => self.title = title,
            ChatEntry::Session { session_id, .. } => self.session_id = Some(session_id),
        }
    }

    fn read(path: &Path) -> std::io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut state = Self::default();
        let mut saw_metadata = false;

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ChatEntry>(&line) {
                Ok(entry) => {
                    saw_metadata |= matches!(entry, ChatEntry::Metadata { .. });
                    state.apply(entry);
                }
                Err(e) => tracing::warn!("Skipping malformed entry in {}: {}", path.display(), e),
            }
        }

        if !saw_metadata {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Chat file has no metadata: {}", path.display()),
            ));
        }
        Ok(state)
    }
}

fn write_entry(writer: &mut impl Write, entry: &ChatEntry) -> std::io::Result<()> {
    writeln!(writer, "{}", serde_json::to_string(entry)?)?;
    writer.flush()
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Directory of chat files
#[derive(Debug, Clone)]
pub struct ChatStore {
    root: PathBuf,
}

impl ChatStore {
    /// Get the default chats directory
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("elevate")
            .join("chats")
    }

    pub fn open_default() -> Self {
        Self::new(Self::default_dir())
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> std::io::Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid chat id: {}", id),
            ));
        }
        Ok(self.root.join(format!("{}.jsonl", id)))
    }

    fn existing_path(&self, id: &str) -> std::io::Result<PathBuf> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Chat not found: {}", id),
            ));
        }
        Ok(path)
    }

    /// Create a new, empty chat titled [`DEFAULT_TITLE`]
    pub fn create(&self) -> std::io::Result<Chat> {
        fs::create_dir_all(&self.root)?;

        let id = uuid::Uuid::new_v4().to_string();
        let path = self.path_for(&id)?;
        let mut writer = BufWriter::new(File::create(&path)?);

        let created_at = now_millis();
        write_entry(
            &mut writer,
            &ChatEntry::Metadata {
                id: id.clone(),
                created_at,
                title: DEFAULT_TITLE.to_string(),
                session_id: None,
            },
        )?;

        Ok(Chat {
            state: ChatState {
                id,
                created_at,
                title: DEFAULT_TITLE.to_string(),
                session_id: None,
                messages: Vec::new(),
            },
            writer,
        })
    }

    /// Load an existing chat and open it for appending
    pub fn load(&self, id: &str) -> std::io::Result<Chat> {
        let path = self.existing_path(id)?;
        let state = ChatState::read(&path)?;
        let writer = BufWriter::new(File::options().append(true).open(&path)?);
        Ok(Chat { state, writer })
    }

    /// List all chats, newest first
    pub fn list(&self) -> std::io::Result<Vec<ChatInfo>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut chats = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("jsonl") {
                continue;
            }
            match ChatState::read(&path) {
                Ok(state) => chats.push(ChatInfo {
                    id: state.id,
                    created_at: state.created_at,
                    title: state.title,
                    message_count: state.messages.len(),
                }),
                Err(e) => tracing::warn!("Skipping unreadable chat {}: {}", path.display(), e),
            }
        }

        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chats)
    }

    /// Rename a chat without loading it
    pub fn rename(&self, id: &str, title: &str) -> std::io::Result<()> {
        let path = self.existing_path(id)?;
        let mut file = File::options().append(true).open(path)?;
        write_entry(
            &mut file,
            &ChatEntry::Title {
                title: title.to_string(),
                timestamp: now_millis(),
            },
        )
    }

    pub fn delete(&self, id: &str) -> std::io::Result<()> {
        fs::remove_file(self.existing_path(id)?)
    }

    /// Delete every chat; returns how many were removed
    pub fn delete_all(&self) -> std::io::Result<usize> {
        let chats = self.list()?;
        for chat in &chats {
            self.delete(&chat.id)?;
        }
        Ok(chats.len())
    }
}

/// An open chat, appending to its file as the conversation grows
pub struct Chat {
    state: ChatState,
    writer: BufWriter<File>,
}

impl Chat {
    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn title(&self) -> &str {
        &self.state.title
    }

    /// Upstream session this chat continues, if any
    pub fn session_id(&self) -> Option<&str> {
        self.state.session_id.as_deref()
    }

    pub fn messages(&self) -> &[StoredMessage] {
        &self.state.messages
    }

    pub fn append_message(&mut self, role: Role, content: &str, thinking: Option<&str>) -> std::io::Result<()> {
        let entry = ChatEntry::Message {
            role,
            content: content.to_string(),
            thinking: thinking.filter(|t| !t.is_empty()).map(str::to_string),
            timestamp: now_millis(),
        };
        write_entry(&mut self.writer, &entry)?;
        self.state.apply(entry);
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) -> std::io::Result<()> {
        if self.state.title == title {
            return Ok(());
        }
        let entry = ChatEntry::Title {
            title: title.to_string(),
            timestamp: now_millis(),
        };
        write_entry(&mut self.writer, &entry)?;
        self.state.apply(entry);
        Ok(())
    }

    pub fn set_session_id(&mut self, session_id: &str) -> std::io::Result<()> {
        if self.session_id() == Some(session_id) {
            return Ok(());
        }
        let entry = ChatEntry::Session {
            session_id: session_id.to_string(),
            timestamp: now_millis(),
        };
        write_entry(&mut self.writer, &entry)?;
        self.state.apply(entry);
        Ok(())
    }
}
