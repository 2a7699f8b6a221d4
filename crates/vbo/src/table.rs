//! Structured view of the `[data]` section as row-aligned string columns.

use indexmap::IndexMap;

use crate::error::{Result, VboError};

/// The `[data]` section as an ordered mapping of column name to per-row
/// string values.
///
/// Every value keeps the exact textual form it will be written with (leading
/// zeros, signs, width, decimals), so an untouched column serializes back
/// byte-identically. All columns share one row count (`nval`), which is fixed
/// at parse time; column add/remove changes the column set, never the rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    columns: IndexMap<String, Vec<String>>,
    nval: usize,
    /// Raw column-header line as read from the file, extended in place when
    /// columns are appended and rebuilt when columns are removed.
    header_line: String,
    delimiter: u8,
    /// Blank lines between the `[data]` header and the column-header row.
    leading_blanks: usize,
    /// Blank lines after the last data row.
    trailing_blanks: usize,
}

impl DataTable {
    /// Build a table from pre-split columns. All columns must share one
    /// length; names must be non-empty and unique (the map enforces
    /// uniqueness, insertion order is the column order).
    pub fn from_columns(columns: IndexMap<String, Vec<String>>, delimiter: u8) -> Result<Self> {
        let nval = columns.values().next().map(Vec::len).unwrap_or(0);
        for (name, values) in &columns {
            if name.is_empty() {
                return Err(VboError::InvalidColumnName(name.clone()));
            }
            if values.len() != nval {
                return Err(VboError::RowCountMismatch {
                    column: name.clone(),
                    expected: nval,
                    actual: values.len(),
                });
            }
        }
        let header_line = join_names(columns.keys(), delimiter);
        Ok(Self {
            columns,
            nval,
            header_line,
            delimiter,
            leading_blanks: 0,
            trailing_blanks: 0,
        })
    }

    /// Constructor used by the parser, which has already validated the parts
    /// and carries the raw header line through for byte-exact rewrite.
    pub(crate) fn from_parts(
        columns: IndexMap<String, Vec<String>>,
        nval: usize,
        header_line: String,
        delimiter: u8,
        leading_blanks: usize,
        trailing_blanks: usize,
    ) -> Self {
        Self {
            columns,
            nval,
            header_line,
            delimiter,
            leading_blanks,
            trailing_blanks,
        }
    }

    /// Number of data rows; 0 if the table has no columns.
    pub fn row_count(&self) -> usize {
        if self.columns.is_empty() { 0 } else { self.nval }
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names in file order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Whether a column with this exact (case-sensitive) name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Values of a column by name.
    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// A single cell by column name and row index.
    pub fn value(&self, name: &str, row: usize) -> Option<&str> {
        self.columns.get(name).and_then(|v| v.get(row)).map(String::as_str)
    }

    /// Iterate `(name, values)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// The field delimiter the table was read with and will be written with.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// The column-header line as it will be written.
    pub fn header_line(&self) -> &str {
        &self.header_line
    }

    pub(crate) fn leading_blanks(&self) -> usize {
        self.leading_blanks
    }

    pub(crate) fn trailing_blanks(&self) -> usize {
        self.trailing_blanks
    }

    /// Append a column. The first column added to an empty table defines the
    /// row count; afterwards `values` must match it exactly.
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<String>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(VboError::InvalidColumnName(name));
        }
        if self.columns.contains_key(&name) {
            return Err(VboError::DuplicateColumn(name));
        }
        if self.columns.is_empty() {
            self.nval = values.len();
            self.header_line = name.clone();
        } else {
            if values.len() != self.nval {
                return Err(VboError::RowCountMismatch {
                    column: name,
                    expected: self.nval,
                    actual: values.len(),
                });
            }
            self.header_line.push(self.delimiter as char);
            self.header_line.push_str(&name);
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Remove a column. The row count is unaffected; the header line is
    /// rebuilt from the remaining names.
    pub fn remove_column(&mut self, name: &str) -> Result<()> {
        if self.columns.shift_remove(name).is_none() {
            return Err(VboError::ColumnNotFound(name.to_string()));
        }
        self.header_line = join_names(self.columns.keys(), self.delimiter);
        Ok(())
    }

    /// Verify the shared-length invariant. Mutations uphold it by
    /// construction; the compute engine re-checks before committing.
    pub(crate) fn check_lengths(&self) -> Result<()> {
        for (name, values) in &self.columns {
            if values.len() != self.nval {
                return Err(VboError::RowCountMismatch {
                    column: name.clone(),
                    expected: self.nval,
                    actual: values.len(),
                });
            }
        }
        Ok(())
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a String>, delimiter: u8) -> String {
    names
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(&(delimiter as char).to_string())
}
