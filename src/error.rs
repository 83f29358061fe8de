//! Errors raised while loading behavior reports. The engine itself never fails.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DssError {
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("DATABASE_URL or DB_* settings must be set when no --csv source is given")]
    MissingDatabaseUrl,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("behavior report {0} not found")]
    ReportNotFound(i64),
}

pub type DssResult<T> = Result<T, DssError>;
