//! Error types for u-eda.

use thiserror::Error;

/// All errors produced by u-eda operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EdaError {
    /// CSV parsing failed.
    #[error("CSV parse error at line {line}: {message}")]
    CsvParse { line: usize, message: String },
    /// Column contains missing values where none are allowed.
    #[error("column '{column}' has {count} missing values")]
    MissingValues { column: String, count: usize },
    /// Column is not numeric where numeric data is required.
    #[error("column '{column}' is not numeric")]
    NonNumericColumn { column: String },
    /// Insufficient data for the requested operation.
    #[error("need at least {min_required} rows, got {actual}")]
    InsufficientData { min_required: usize, actual: usize },
    /// Column not found in DataFrame.
    #[error("column '{name}' not found")]
    ColumnNotFound { name: String },
    /// Dimension mismatch.
    #[error("expected {expected} elements, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Least-squares design matrix could not be inverted.
    #[error("regression design for '{target}' is singular")]
    SingularDesign { target: String },
    /// Configuration could not be parsed or is incomplete.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// I/O error during file reading.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EdaError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for EdaError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}
