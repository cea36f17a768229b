//! Slash commands for interactive mode

mod chats;
mod mode;
mod thinking;

pub use chats::{ChatsCommand, format_chats};
pub use mode::ModeCommand;
pub use thinking::ThinkingCommand;

use std::path::PathBuf;

use elevate_ai::ChatMode;

use crate::store::ChatStore;

/// Result of executing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Start a fresh chat
    NewChat,
    /// Continue a stored chat
    OpenChat(String),
    /// Retitle the current chat
    Rename(String),
    /// Switch between chat and act
    ChangeMode(ChatMode),
    /// Show or hide the reasoning trace
    SetThinking(bool),
    /// Queue a file for the next message
    Attach(PathBuf),
    /// Show a message to the user (not sent upstream)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(
    input: &str,
    store: &ChatStore,
    current_chat: Option<&str>,
    current_mode: ChatMode,
    show_thinking: bool,
) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let (command, args) = match rest.split_once(' ') {
        Some((command, args)) => (command.to_lowercase(), args.trim()),
        None => (rest.to_lowercase(), ""),
    };

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "new" | "n" => CommandResult::NewChat,

        "chats" | "ls" => ChatsCommand::execute(store, current_chat),

        "open" | "o" => {
            if args.is_empty() {
                CommandResult::Message("Usage: /open <chat-id>".to_string())
            } else {
                CommandResult::OpenChat(args.to_string())
            }
        }

        "rename" | "r" => {
            if args.is_empty() {
                CommandResult::Message("Usage: /rename <title>".to_string())
            } else {
                CommandResult::Rename(args.to_string())
            }
        }

        "mode" | "m" => ModeCommand::execute(args, current_mode),

        "thinking" | "t" => ThinkingCommand::execute(args, show_thinking),

        "attach" | "a" => {
            if args.is_empty() {
                CommandResult::Message("Usage: /attach <path>".to_string())
            } else {
                CommandResult::Attach(PathBuf::from(args))
            }
        }

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /new, /n             Start a new chat
  /chats, /ls          List saved chats
  /open, /o <id>       Continue a saved chat
  /rename, /r <title>  Rename the current chat
  /mode, /m [mode]     Show or set the mode (chat, act)
  /thinking, /t [on|off]
                       Show or toggle the reasoning trace
  /attach, /a <path>   Attach a file to the next message
  /quit, /exit, /q     Exit elevate

Press Ctrl-C while a reply is streaming to stop it."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> Option<CommandResult> {
        let dir = tempfile::tempdir().unwrap();
        let store = ChatStore::new(dir.path());
        execute_command(input, &store, None, ChatMode::Chat, true)
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(run("hello"), None);
        assert_eq!(run(""), None);
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(run("/new"), Some(CommandResult::NewChat));
        assert_eq!(run("  /QUIT  "), Some(CommandResult::Exit));
        assert_eq!(run("/q"), Some(CommandResult::Exit));
        assert!(matches!(run("/help"), Some(CommandResult::Message(m)) if m.contains("/attach")));
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(
            run("/rename   Trip planning  "),
            Some(CommandResult::Rename("Trip planning".into()))
        );
        assert_eq!(
            run("/attach ./notes/report.pdf"),
            Some(CommandResult::Attach(PathBuf::from("./notes/report.pdf")))
        );
        assert_eq!(run("/open abc"), Some(CommandResult::OpenChat("abc".into())));
    }

    #[test]
    fn test_missing_arguments_show_usage() {
        for input in ["/rename", "/attach", "/open"] {
            assert!(
                matches!(run(input), Some(CommandResult::Message(m)) if m.starts_with("Usage:")),
                "{}",
                input
            );
        }
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(run("/frobnicate now"), Some(CommandResult::Unknown("frobnicate".into())));
    }
}
