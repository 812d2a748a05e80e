//! Inbound line grammar
//!
//! A line starting with the command prefix (`\`) is a command; anything
//! else is chat. Command words match case-insensitively. Arguments are
//! split on whitespace, and multi-word arguments are re-joined with
//! single spaces.

use crate::error::CommandError;
use crate::types::{truncate_on_char_boundary, ClientId, DisplayName, MAX_MESSAGE_LEN};

/// Marks a line as a command rather than chat
pub const COMMAND_PREFIX: char = '\\';

/// Client → Server line, parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `\NAME <name>`
    Rename(DisplayName),
    /// `\QUIT`
    Quit,
    /// `\PING`
    Ping,
    /// `\PRIVATE <id> <message...>`
    Private { target: ClientId, text: String },
    /// `\ACTIVE`
    ListActive,
    /// `\HELP`
    Help,
    /// Any line without the prefix
    Chat(String),
    /// Prefixed line with an unrecognized command word
    Unknown(String),
}

impl Command {
    /// Parse one non-empty inbound line
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let Some(body) = line.strip_prefix(COMMAND_PREFIX) else {
            return Ok(Command::Chat(bounded_text(line)));
        };

        let mut tokens = body.split_whitespace();
        let word = tokens.next().unwrap_or("");

        let command = match word.to_ascii_uppercase().as_str() {
            "NAME" => {
                let name = tokens.collect::<Vec<_>>().join(" ");
                Command::Rename(DisplayName::parse(&name)?)
            }
            "QUIT" => Command::Quit,
            "PING" => Command::Ping,
            "PRIVATE" => {
                let reference = tokens.next().ok_or(CommandError::MissingReference)?;
                let target = reference
                    .parse::<ClientId>()
                    .map_err(|_| CommandError::InvalidReference(reference.to_string()))?;
                let text = tokens.collect::<Vec<_>>().join(" ");
                if text.is_empty() {
                    return Err(CommandError::MissingMessage);
                }
                Command::Private {
                    target,
                    text: bounded_text(&text),
                }
            }
            "ACTIVE" => Command::ListActive,
            "HELP" => Command::Help,
            _ => Command::Unknown(word.to_string()),
        };
        Ok(command)
    }
}

fn bounded_text(text: &str) -> String {
    truncate_on_char_boundary(text, MAX_MESSAGE_LEN).to_string()
}

/// Command summary sent in reply to `\HELP`
pub const HELP_TEXT: &str = "commands:\r\n\
    \\NAME <name>             change your display name\r\n\
    \\PRIVATE <id> <message>  send a private message\r\n\
    \\ACTIVE                  list connected clients\r\n\
    \\PING                    check the connection\r\n\
    \\HELP                    show this help\r\n\
    \\QUIT                    leave the chat";
