//! Page → worker control messages.

use glassboat_core::Error;
use serde::{Deserialize, Serialize};

const SKIP_WAITING: &str = "SKIP_WAITING";

/// The only command a page can send: take over now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    SkipWaiting,
}

/// What a worker did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOutcome {
    /// The worker will activate as soon as the registration lets it.
    Accepted,
    /// Nothing was waiting; the message changed nothing.
    Ignored,
}

impl std::fmt::Display for MessageOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageOutcome::Accepted => write!(f, "accepted"),
            MessageOutcome::Ignored => write!(f, "ignored"),
        }
    }
}

impl std::str::FromStr for WorkerMessage {
    type Err = Error;

    /// Accepts `SKIP_WAITING`, `"SKIP_WAITING"` or `{"type":"SKIP_WAITING"}`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed == SKIP_WAITING {
            return Ok(WorkerMessage::SkipWaiting);
        }
        if let Ok(message) = serde_json::from_str::<WorkerMessage>(trimmed) {
            return Ok(message);
        }
        match serde_json::from_str::<String>(trimmed) {
            Ok(command) if command == SKIP_WAITING => Ok(WorkerMessage::SkipWaiting),
            _ => Err(Error::InvalidMessage(trimmed.to_string())),
        }
    }
}
