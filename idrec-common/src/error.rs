//! Common error types for idrec

use thiserror::Error;

/// Common result type for idrec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across idrec services
#[derive(Error, Debug)]
pub enum Error {
    /// Store read/write failure (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Attempt to persist a contact that carries neither email nor phone
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Cluster shape broken (zero or several primaries where one is required)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the underlying store reported lock contention
    /// (`SQLITE_BUSY`, `SQLITE_LOCKED` or any of their extended codes).
    ///
    /// A unit of work failing this way can be re-run from the start.
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => {
                let busy_code = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| matches!(code & 0xff, 5 | 6))
                    .unwrap_or(false);
                busy_code || db_err.message().contains("database is locked")
            }
            _ => false,
        }
    }
}
