// src/error.rs
//
// Error taxonomy for the scheduling core.
//
// Every failure the core can produce is an input problem detected before the
// first dispatch cycle. Once the loop starts it always runs to completion.

use thiserror::Error;

/// Errors returned by the scheduling entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedError {
    /// The request (work items or configuration) is malformed.
    #[error("invalid input in '{field}': {message}")]
    InvalidInput { field: String, message: String },
}

impl SchedError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        SchedError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for errors the caller must fix in the request (a 400, not a 500).
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, SchedError::InvalidInput { .. })
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            SchedError::InvalidInput { field, .. } => field,
        }
    }
}

pub type SchedResult<T> = Result<T, SchedError>;
