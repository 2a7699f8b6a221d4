//! Source metadata captured at load time.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::section::LineEnding;

/// Metadata about the source file a document was loaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected field delimiter of the data section.
    pub delimiter: char,
    /// Detected line-ending convention.
    pub line_ending: LineEnding,
    /// Number of data rows.
    pub row_count: usize,
    /// Number of data columns.
    pub column_count: usize,
    /// Number of sections in the file.
    pub section_count: usize,
    /// When the file was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        delimiter: char,
        line_ending: LineEnding,
        row_count: usize,
        column_count: usize,
        section_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash,
            size_bytes,
            delimiter,
            line_ending,
            row_count,
            column_count,
            section_count,
            loaded_at: Utc::now(),
        }
    }
}
