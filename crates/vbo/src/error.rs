//! Error types for the VBO library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for VBO operations.
#[derive(Debug, Error)]
pub enum VboError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed section or data structure at parse time.
    #[error("Format error at line {line}: {message}")]
    Format { line: usize, message: String },

    /// A column name that is empty or otherwise unusable.
    #[error("Invalid column name: {0:?}")]
    InvalidColumnName(String),

    /// Attempt to add a column under a name that is already taken.
    #[error("Column '{0}' already exists")]
    DuplicateColumn(String),

    /// A named column is not present in the data table.
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// A named section is not present in the file.
    #[error("Section '[{0}]' not found")]
    MissingSection(String),

    /// Attempt to insert a section under a name that is already taken.
    #[error("Section '[{0}]' already exists")]
    DuplicateSection(String),

    /// A column's value count does not match the table's row count.
    #[error("Row count mismatch for column '{column}': expected {expected}, got {actual}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A compute function violated its contract.
    #[error("Compute contract violation for column '{column}': {message}")]
    ComputeContract { column: String, message: String },

    /// A source value could not be interpreted as a number.
    #[error("Cannot parse value {value:?} in column '{column}', row {row}")]
    ValueParse {
        column: String,
        row: usize,
        value: String,
    },

    /// The in-memory state cannot be rendered back to valid VBO text.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for VBO operations.
pub type Result<T> = std::result::Result<T, VboError>;
