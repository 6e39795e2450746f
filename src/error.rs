use std::path::PathBuf;

use thiserror::Error;

use crate::session::SessionError;

/// Result type alias using liftlog's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the plan provider, the log store, and the glue between them
#[derive(Error, Debug)]
pub enum Error {
    #[error("Plan '{0}' not found. Run `liftlog plans` to see available plans.")]
    PlanNotFound(String),

    #[error("Invalid plan document {}: {}", .path.display(), .source)]
    InvalidPlan {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}
