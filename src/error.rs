//! Error kinds shared by the registry, the dispatcher and the handlers.

use std::time::Duration;
use thiserror::Error;

/// Generic text shown to the user when a command fails for reasons they can't fix.
pub const GENERIC_FAILURE: &str = "There was an error while executing this command!";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command `{0}` is already registered")]
    Duplicate(String),

    #[error("command `{command}` declares option `{option}` more than once")]
    DuplicateOption { command: String, option: String },

    #[error("command `{0}` is not registered")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum CommandError {
    /// Bad or missing input. The message is shown to the user as-is.
    #[error("{0}")]
    Validation(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Discord API error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),
}

impl CommandError {
    pub fn validation(message: impl Into<String>) -> Self {
        CommandError::Validation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        CommandError::Transport(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CommandError::Validation(_))
    }

    /// Text to show the invoking user for this failure.
    pub fn user_message(&self) -> &str {
        match self {
            CommandError::Validation(message) => message,
            _ => GENERIC_FAILURE,
        }
    }
}
