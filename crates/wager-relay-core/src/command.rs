//! Messaging-channel commands and the replies sent for them.

use crate::{ActionResult, ChatId};

/// Reply to the greeting command.
pub const GREETING: &str = "Hello! I am your dice game bot. Use /run to start the dice game script.";
/// Reply when a start-loop command is accepted.
pub const STARTING: &str = "Starting the dice game script...";
/// Reply when a start-loop command hits a live session.
pub const ALREADY_RUNNING: &str = "Script is already running!";
/// Reply when a stop-loop command is accepted.
pub const STOPPING: &str = "Stopping the dice game script...";
/// Reply when a stop-loop command finds nothing to stop.
pub const NOTHING_TO_STOP: &str = "No script is currently running.";

/// Command issued by a tenant through the messaging channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Greet,
    /// `/run`
    Run,
    /// `/stop`
    Stop,
}

impl Command {
    /// Parse the leading slash command of a message.
    ///
    /// A `@botname` suffix on the command is ignored. Returns `None` for
    /// anything that is not one of the known commands.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        match name {
            "/start" => Some(Self::Greet),
            "/run" => Some(Self::Run),
            "/stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// A parsed command together with the chat it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingCommand {
    pub chat_id: ChatId,
    pub command: Command,
}

/// Periodic status line sent every N requests.
#[must_use]
pub fn progress_message(requests: u64, result: &ActionResult) -> String {
    format!(
        "Requests sent: {requests} | Balance: {:.2} | Win: {}",
        result.balance, result.favorable
    )
}

/// Terminal notice sent when a runner stops on an error.
#[must_use]
pub fn failure_message(error: &impl std::fmt::Display) -> String {
    format!("Script stopped due to error: {error}")
}
