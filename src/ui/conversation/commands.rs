use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Start a new conversation
    New,
    /// Send one of the suggested questions
    Suggest,
    /// Show or hide the information sidebar
    Sidebar,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub keyword: &'static str,
    pub description: &'static str,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// 1-based suggestion number for `/suggest N`
    pub fn suggestion_number(&self) -> Option<usize> {
        if self.command != SlashCommand::Suggest {
            return None;
        }
        self.argument()?.trim().parse().ok()
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "bắt đầu cuộc trò chuyện mới",
            SlashCommand::Suggest => "gửi câu hỏi gợi ý số N (1-4)",
            SlashCommand::Sidebar => "ẩn/hiện thông tin liên hệ",
            SlashCommand::Help => "hiển thị các lệnh",
            SlashCommand::Quit => "thoát",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let rest: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(&head).ok().or_else(|| match head.as_str() {
        "q" | "bye" | "exit" => Some(SlashCommand::Quit),
        "reset" | "clear" => Some(SlashCommand::New),
        "s" => Some(SlashCommand::Suggest),
        "h" | "?" => Some(SlashCommand::Help),
        _ => None,
    })?;

    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let commands: Vec<String> = command_entries()
        .iter()
        .map(|entry| format!("/{} {}", entry.keyword, entry.description))
        .collect();

    format!(
        "{} · Enter gửi · F1-F4 gợi ý · Ctrl+N mới · Ctrl+B thông tin · Ctrl+C thoát",
        commands.join(" · ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_aliases() {
        assert_eq!(
            parse_slash_command("/new"),
            Some(ParsedCommand { command: SlashCommand::New, argument: None })
        );
        assert_eq!(parse_slash_command("/reset").map(|c| c.command), Some(SlashCommand::New));
        assert_eq!(parse_slash_command(" /Q ").map(|c| c.command), Some(SlashCommand::Quit));
        assert_eq!(parse_slash_command("/help").map(|c| c.command), Some(SlashCommand::Help));
    }

    #[test]
    fn plain_text_and_unknown_commands_are_not_commands() {
        assert_eq!(parse_slash_command("điểm chuẩn CNTT?"), None);
        assert_eq!(parse_slash_command("/"), None);
        assert_eq!(parse_slash_command("/hocphi"), None);
    }

    #[test]
    fn suggest_takes_a_number() {
        let parsed = parse_slash_command("/suggest 3").unwrap();
        assert_eq!(parsed.argument(), Some("3"));
        assert_eq!(parsed.suggestion_number(), Some(3));

        assert_eq!(parse_slash_command("/s x").unwrap().suggestion_number(), None);
        assert_eq!(parse_slash_command("/new 3").unwrap().suggestion_number(), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = get_help_text();
        for entry in command_entries() {
            assert!(help.contains(&format!("/{}", entry.keyword)));
        }
    }
}
