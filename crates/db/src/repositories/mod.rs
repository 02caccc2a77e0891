use chrono::{DateTime, Utc};
use thiserror::Error;

use helpline_core::errors::ApplicationError;

pub mod help_thread;
pub mod memory;
pub mod moderation;

pub use help_thread::SqlHelpThreadRepository;
pub use memory::{InMemoryHelpThreadRepository, InMemoryModerationActionRepository};
pub use moderation::SqlModerationActionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid `{column}` timestamp `{value}`: {error}")))
}
