use thiserror::Error;

/// Fatal scenario errors
///
/// Anything surfaced through this type aborts the run. Worker-level
/// transaction failures are caught by the runner and reported as
/// `WorkerOutcome::RolledBack` instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Application error: {0}")]
    Application(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl Error {
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application(message.into())
    }

    pub fn invalid_row(message: impl Into<String>) -> Self {
        Self::InvalidRow(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
