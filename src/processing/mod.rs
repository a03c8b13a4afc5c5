//! Reading processing - Urban Stress Index scoring, classification and
//! fallback explanations.
//!
//! Everything in here is pure and synchronous: identical input always yields
//! identical output, and no function touches shared state.

mod stress_index;
mod classifier;
mod explanation;

pub use stress_index::*;
pub use classifier::*;
pub use explanation::*;

use thiserror::Error;

/// Errors raised while scoring a reading
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Invalid input: {field} = {value}")]
    InvalidInput { field: &'static str, value: String },
}

impl ScoringError {
    pub(crate) fn invalid(field: &'static str, value: impl ToString) -> Self {
        ScoringError::InvalidInput {
            field,
            value: value.to_string(),
        }
    }
}
