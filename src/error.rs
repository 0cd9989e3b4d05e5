//! Error types.

use thiserror::Error;

/// Errors raised before a search starts.
///
/// Nothing inside the search loop is fatal: missing history entries fall
/// back to empty defaults and overflowing acceptance probabilities clamp
/// to 1.0.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroupingError {
    /// Group or topic counts cannot be derived from the input.
    #[error("invalid population: {reason}")]
    InvalidPopulation { reason: String },

    /// A configuration value is out of range.
    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl GroupingError {
    pub(crate) fn population(reason: impl Into<String>) -> Self {
        GroupingError::InvalidPopulation {
            reason: reason.into(),
        }
    }

    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        GroupingError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

pub type GroupingResult<T> = Result<T, GroupingError>;
