//! Errors raised while configuring, connecting to and migrating the
//! marketplace database.

use sqlx::Error as SqlxError;
use sqlx::migrate::MigrateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The pool could not reach the server
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// `DATABASE_URL` is not a valid PostgreSQL URL
    #[error("Invalid database URL: {0}")]
    InvalidUrl(#[source] SqlxError),

    /// A migration failed or the applied history diverges from the files
    #[error("Database migration error: {0}")]
    Migration(#[from] MigrateError),

    /// Inconsistent pool settings
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
