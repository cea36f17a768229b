//! /thinking command - show or hide the reasoning trace

use super::CommandResult;

pub struct ThinkingCommand;

impl ThinkingCommand {
    pub fn execute(args: &str, current: bool) -> CommandResult {
        if args.is_empty() {
            return CommandResult::SetThinking(!current);
        }
        match args.to_lowercase().as_str() {
            "on" | "show" | "true" | "1" => CommandResult::SetThinking(true),
            "off" | "hide" | "false" | "0" => CommandResult::SetThinking(false),
            _ => CommandResult::Message(format!(
                "Unknown value: '{}'\nUse /thinking on or /thinking off",
                args
            )),
        }
    }
}
