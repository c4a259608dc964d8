//! Error types for loading and aggregating flow data.

use thiserror::Error;

/// Errors raised while reading the flow table or building a diagram.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid input: required column '{column}' not found in header")]
    MissingColumn { column: String },

    #[error("Invalid input: row {row} has a non-numeric population value '{value}'")]
    InvalidPopulation { row: usize, value: String },

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Returns true for errors caused by malformed data rather than I/O.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            FlowError::InvalidInput(_)
                | FlowError::MissingColumn { .. }
                | FlowError::InvalidPopulation { .. }
        )
    }
}
