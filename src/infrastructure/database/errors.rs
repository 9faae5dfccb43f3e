use thiserror::Error;

use crate::domain::errors::EngineError;

/// Errors raised by the `MySQL` adapter.
///
/// Converted into [`EngineError::Database`] at the port boundary.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// A query or connection failed
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    /// Applying the embedded migrations failed
    #[error("Migration failed: {0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),

    /// The configured URL could not be parsed
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),
}

impl From<DatabaseError> for EngineError {
    fn from(err: DatabaseError) -> Self {
        Self::Database(err.to_string())
    }
}
