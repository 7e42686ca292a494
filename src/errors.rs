//! Unified error type for the transition engine.
//!
//! Lower layers return these errors with `?`; the orchestrator is the only place
//! that turns them into a user-facing outcome.

use thiserror::Error;

/// Every failure the engine and its persistence layer can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings could not be read or were out of range.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// The underlying database rejected a query.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A stored JSON document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// One or more envelopes have an incomplete transfer configuration.
    #[error("Invalid transition choices: {}", violations.join("; "))]
    Validation {
        /// One human-readable description per offending envelope
        violations: Vec<String>,
    },

    /// There were no budgets to transition against.
    #[error("No budgets found for dashboard '{dashboard_id}'")]
    NoBudgets {
        /// Dashboard that was being transitioned
        dashboard_id: String,
    },

    /// A single persistence write failed; earlier writes are not rolled back.
    #[error("Failed to write {entity} {id}: {message}")]
    Write {
        /// Kind of record, e.g. `"budget"`
        entity: &'static str,
        /// Identifier of the record
        id: i64,
        /// Underlying failure
        message: String,
    },

    /// Saving the transition preferences failed after the transition committed.
    #[error("Failed to save transition preferences: {message}")]
    PreferenceSave {
        /// Underlying failure
        message: String,
    },
}

impl Error {
    /// Wraps any failure of a single write into [`Error::Write`].
    pub fn write(entity: &'static str, id: i64, source: impl std::fmt::Display) -> Self {
        Self::Write {
            entity,
            id,
            message: source.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
