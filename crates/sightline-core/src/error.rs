//! Error types for Sightline

use crate::infrastructure::crypto::CipherError;
use thiserror::Error;

/// Result type alias using Sightline's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Sightline error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Execution errors (E100-E199)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Search execution failed: {0}")]
    Execution(String),

    #[error("Decryption failed for column '{column}': {source}")]
    Decrypt {
        column: String,
        #[source]
        source: CipherError,
    },

    // Timeout errors (E200-E299)
    #[error("Search timed out after {0}s waiting for row population")]
    Timeout(u64),

    // Request/schema errors (E300-E399)
    #[error("Cannot sort by '{0}': not a sortable field of this view")]
    InvalidSortField(String),

    #[error("Unknown bound '{0}' for this view")]
    UnknownBound(String),

    #[error("Invalid bound value: {0}")]
    InvalidBoundValue(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E100",
            Self::Execution(_) => "E101",
            Self::Decrypt { .. } => "E102",
            Self::Timeout(_) => "E200",
            Self::InvalidSortField(_) => "E300",
            Self::UnknownBound(_) => "E301",
            Self::InvalidBoundValue(_) => "E302",
            Self::ConfigError(_) => "E600",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Database(_) => {
                Some("Check that the database file exists and the search view has been created".to_string())
            }
            Self::Decrypt { .. } => {
                Some("Check that the configured key matches the one the data was encrypted with".to_string())
            }
            Self::Timeout(_) => {
                Some("Raise search.join_timeout_secs or narrow the candidate set with bounds".to_string())
            }
            Self::InvalidSortField(_) => {
                Some("Sort by one of the fields declared by the view".to_string())
            }
            Self::UnknownBound(_) | Self::InvalidBoundValue(_) => {
                Some("Use a bound declared by the view, as name=value".to_string())
            }
            _ => None,
        }
    }

    /// Whether this error describes a bad request or view definition rather
    /// than a failed execution. Callers map the former to client errors and
    /// the latter (database, decryption, timeout) to server errors.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::InvalidSortField(_) | Self::UnknownBound(_) | Self::InvalidBoundValue(_)
        )
    }
}
