//! /chats command - list saved chats

use super::CommandResult;
use crate::store::{ChatInfo, ChatStore};
use crate::utils::truncate_chars;

pub struct ChatsCommand;

impl ChatsCommand {
    pub fn execute(store: &ChatStore, current: Option<&str>) -> CommandResult {
        match store.list() {
            Ok(chats) => CommandResult::Message(format_chats(&chats, current)),
            Err(e) => CommandResult::Message(format!("Failed to list chats: {}", e)),
        }
    }
}

/// Render a chat listing, marking the open chat with `*`
pub fn format_chats(chats: &[ChatInfo], current: Option<&str>) -> String {
    if chats.is_empty() {
        return "No saved chats.".to_string();
    }

    let mut output = String::from("Saved chats:\n\n");
    for chat in chats {
        let marker = if Some(chat.id.as_str()) == current { "*" } else { " " };
        output.push_str(&format!(
            "{} {}  {}  {:<40} ({} messages)\n",
            marker,
            chat.id,
            chat.created_at_display(),
            truncate_chars(&chat.title, 37),
            chat.message_count
        ));
    }
    output.push_str("\nContinue one with: /open <id>");
    output
}
