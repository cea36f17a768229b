//! /mode command - show and set the chat mode

use super::CommandResult;
use elevate_ai::ChatMode;

pub struct ModeCommand;

impl ModeCommand {
    pub fn execute(args: &str, current: ChatMode) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message(show_modes(current));
        }
        match args.parse::<ChatMode>() {
            Ok(mode) => CommandResult::ChangeMode(mode),
            Err(_) => CommandResult::Message(format!(
                "Unknown mode: '{}'\nValid modes: chat, act",
                args
            )),
        }
    }
}

fn show_modes(current: ChatMode) -> String {
    let modes = [
        (ChatMode::Chat, "Streamed conversational replies"),
        (ChatMode::Act, "Agent flow that answers in one piece"),
    ];

    let mut output = String::from("Modes:\n\n");
    for (mode, desc) in modes {
        let marker = if mode == current { " *" } else { "" };
        output.push_str(&format!("  {:<6} {}{}\n", mode.name(), desc, marker));
    }
    output.push_str("\nSet with: /mode <mode>");
    output
}
