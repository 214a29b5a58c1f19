use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// An `error` frame inside an otherwise healthy stream
    #[error("Service error: {0}")]
    Service(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Run failed: {0}")]
    RunFailed(String),

    #[error("Stale run: expected {expected}, got {actual}")]
    StaleRun { expected: String, actual: String },

    #[error("A run is still streaming; wait for it to finish")]
    RunInProgress,

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
