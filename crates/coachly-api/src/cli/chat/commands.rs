//! Slash command parsing for the chat loop.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    Exit,
    /// Retry the reply to the last unanswered message.
    Retry,
    /// Show remaining free messages.
    Quota,
    /// Reprint the session so far.
    History,
    /// Join a live video session with the coach.
    Video,
    /// Archive this session and leave.
    End,
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let cmd = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        "/retry" | "/r" => Some(ChatCommand::Retry),
        "/quota" => Some(ChatCommand::Quota),
        "/history" => Some(ChatCommand::History),
        "/video" => Some(ChatCommand::Video),
        "/end" => Some(ChatCommand::End),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}     Show this help message", style("/help").cyan());
    println!("  {}    Retry the coach's reply", style("/retry").cyan());
    println!("  {}    Show your remaining free messages", style("/quota").cyan());
    println!("  {}  Show the session so far", style("/history").cyan());
    println!("  {}    Get a link to a live video call", style("/video").cyan());
    println!("  {}      End this session", style("/end").cyan());
    println!("  {}     Leave the chat (session stays open)", style("/exit").cyan());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(parse("/help"), Some(ChatCommand::Help));
        assert_eq!(parse("/?"), Some(ChatCommand::Help));
        assert_eq!(parse("/q"), Some(ChatCommand::Exit));
        assert_eq!(parse(" /Retry "), Some(ChatCommand::Retry));
        assert_eq!(parse("/end now"), Some(ChatCommand::End));
    }

    #[test]
    fn test_parse_not_command() {
        assert_eq!(parse("how do I stop procrastinating?"), None);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(parse("/foo bar"), Some(ChatCommand::Unknown("/foo".to_string())));
    }
}
