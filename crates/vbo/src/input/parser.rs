//! VBO text parser with delimiter detection.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{Result, VboError};
use crate::section::{DATA_SECTION, LineEnding, Section, SectionStore};
use crate::table::DataTable;

use super::source::SourceMetadata;

/// A section header is a line whose trimmed content is a bracketed name.
static SECTION_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[([^\[\]]+)\]$").unwrap());

/// Delimiters to try when auto-detecting, in preference order.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b' '];

/// Delimiter assumed when the data section gives no signal (single-column
/// files); space is the Racelogic convention.
const DEFAULT_DELIMITER: u8 = b' ';

/// Parser configuration.
#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    /// Field delimiter of the data section (None = auto-detect).
    pub delimiter: Option<u8>,
}

/// Parses VBO files into a [`SectionStore`].
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file and return the section store and source metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(SectionStore, SourceMetadata)> {
        let path = path.as_ref();

        let contents = fs::read(path).map_err(|e| VboError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let size_bytes = contents.len() as u64;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let text = String::from_utf8(contents).map_err(|e| {
            let line = bytes_to_line(e.as_bytes(), e.utf8_error().valid_up_to());
            VboError::Format {
                line,
                message: "file is not valid UTF-8".to_string(),
            }
        })?;

        let store = self.parse_str(&text)?;

        let (row_count, column_count, delimiter) = match store.data() {
            Some(table) => (table.row_count(), table.column_count(), table.delimiter()),
            None => (0, 0, DEFAULT_DELIMITER),
        };
        let metadata = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            size_bytes,
            delimiter as char,
            store.line_ending(),
            row_count,
            column_count,
            store.len(),
        );

        Ok((store, metadata))
    }

    /// Parse raw text directly.
    pub fn parse_str(&self, text: &str) -> Result<SectionStore> {
        let line_ending = if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };
        let trailing_newline = text.ends_with('\n');

        let mut lines: Vec<&str> = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();
        if trailing_newline {
            lines.pop();
        }

        let mut preamble: Vec<String> = Vec::new();
        // (name, raw header line, header line number, body lines)
        let mut collected: Vec<(String, String, usize, Vec<String>)> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx + 1;
            if let Some(caps) = SECTION_HEADER.captures(line.trim()) {
                let name = caps[1].to_lowercase();
                if name.trim().is_empty() {
                    return Err(VboError::Format {
                        line: line_no,
                        message: "empty section name".to_string(),
                    });
                }
                if collected.iter().any(|(n, ..)| *n == name) {
                    return Err(VboError::Format {
                        line: line_no,
                        message: format!("duplicate section '[{name}]'"),
                    });
                }
                collected.push((name, line.to_string(), line_no, Vec::new()));
            } else if let Some((.., body)) = collected.last_mut() {
                body.push(line.to_string());
            } else {
                preamble.push(line.to_string());
            }
        }

        let mut sections = IndexMap::new();
        for (name, header_line, header_line_no, body) in collected {
            let section = if name == DATA_SECTION {
                let table = self.parse_data_section(body, header_line_no)?;
                Section::data(name.clone(), header_line, table)
            } else {
                Section::raw(name.clone(), header_line, body)
            };
            sections.insert(name, section);
        }

        Ok(SectionStore::new(
            preamble,
            sections,
            line_ending,
            trailing_newline,
        ))
    }

    /// Turn the `[data]` body into a table: a column-header row, then one
    /// delimiter-separated line per row with a matching field count.
    fn parse_data_section(&self, mut body: Vec<String>, header_line_no: usize) -> Result<DataTable> {
        let mut trailing_blanks = 0;
        while body.last().is_some_and(|l| l.is_empty()) {
            body.pop();
            trailing_blanks += 1;
        }
        let mut leading_blanks = 0;
        while body.first().is_some_and(|l| l.is_empty()) {
            body.remove(0);
            leading_blanks += 1;
        }

        if body.is_empty() {
            return Err(VboError::Format {
                line: header_line_no,
                message: "[data] section has no column-header row".to_string(),
            });
        }

        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(&body),
        };
        let delim_char = delimiter as char;
        let column_header_no = header_line_no + leading_blanks + 1;

        let header_line = body.remove(0);
        let names: Vec<&str> = header_line.split(delim_char).collect();
        let mut columns: IndexMap<String, Vec<String>> = IndexMap::new();
        for name in &names {
            if name.is_empty() {
                return Err(VboError::Format {
                    line: column_header_no,
                    message: "empty column name in [data] header row".to_string(),
                });
            }
            if columns.insert(name.to_string(), Vec::new()).is_some() {
                return Err(VboError::Format {
                    line: column_header_no,
                    message: format!("duplicate column name '{name}' in [data] header row"),
                });
            }
        }

        let mut nval = 0;
        for (offset, row) in body.iter().enumerate() {
            let line_no = column_header_no + offset + 1;
            if row.is_empty() {
                return Err(VboError::Format {
                    line: line_no,
                    message: "blank line inside [data] rows".to_string(),
                });
            }
            let fields: Vec<&str> = row.split(delim_char).collect();
            if fields.len() != names.len() {
                return Err(VboError::Format {
                    line: line_no,
                    message: format!(
                        "expected {} fields, found {}",
                        names.len(),
                        fields.len()
                    ),
                });
            }
            for (column, field) in columns.values_mut().zip(fields) {
                column.push(field.to_string());
            }
            nval += 1;
        }

        Ok(DataTable::from_parts(
            columns,
            nval,
            header_line,
            delimiter,
            leading_blanks,
            trailing_blanks,
        ))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Detect the data-section delimiter by counting candidate occurrences over
/// the header row and the first few data rows; a candidate only qualifies if
/// its count is consistent on every sampled line.
fn detect_delimiter(lines: &[String]) -> u8 {
    let sample: Vec<&String> = lines.iter().take(10).collect();

    let mut best_delimiter = DEFAULT_DELIMITER;
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| line.bytes().filter(|&b| b == delim).count())
            .collect();

        let first_count = counts[0];
        if first_count == 0 || counts.iter().any(|&c| c != first_count) {
            continue;
        }

        if first_count > best_score {
            best_score = first_count;
            best_delimiter = delim;
        }
    }

    best_delimiter
}

/// 1-based line number of a byte offset, for error reporting.
fn bytes_to_line(bytes: &[u8], offset: usize) -> usize {
    bytes[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}
