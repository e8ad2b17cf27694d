//! Error taxonomy for the report pipeline.
//!
//! Request-level failures are `ReportError`s. Problems confined to a single
//! chart never surface here; they become skipped entries in the manifest.

use crate::recipe::RecipeError;

/// Request-level failure
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The input could not be decoded or is malformed
    #[error("failed to parse table: {0}")]
    Parse(String),

    /// Required columns are absent from the table
    #[error("missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A chart recipe supplied by the caller could not be parsed
    #[error("invalid chart recipe: {0}")]
    Recipe(#[from] RecipeError),

    /// Deployment configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Writing chart output failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Drawing a requested chart failed
    #[error("rendering failed: {0}")]
    Render(String),

    /// A single requested chart could not be produced
    #[error("chart '{id}' was not produced: {reason}")]
    ChartUnavailable { id: String, reason: String },
}

impl ReportError {
    /// Whether the failure is attributable to the caller's input
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReportError::Parse(_)
                | ReportError::Schema { .. }
                | ReportError::Recipe(_)
                | ReportError::ChartUnavailable { .. }
        )
    }

    /// HTTP status a hosting layer should answer with
    #[must_use]
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
