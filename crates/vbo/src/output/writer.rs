//! File writer reproducing the original formatting conventions.

use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, VboError};
use crate::section::{SectionBody, SectionStore};
use crate::table::DataTable;

/// Serializes a [`SectionStore`] back to text. Non-`data` sections are
/// emitted verbatim from their stored raw lines; the `data` section is
/// regenerated from the table. Writing is atomic: the document is rendered
/// fully up front, written to a temp file next to the destination, then
/// renamed into place.
pub struct Writer;

impl Writer {
    /// Create a new writer.
    pub fn new() -> Self {
        Self
    }

    /// Render the document to a string using the store's original
    /// line-ending and trailing-newline conventions.
    pub fn render(&self, store: &SectionStore) -> Result<String> {
        let mut lines: Vec<String> = Vec::new();

        lines.extend(store.preamble().iter().cloned());
        for section in store.iter() {
            lines.push(section.header_line().to_string());
            match section.body() {
                SectionBody::Raw(body) => lines.extend(body.iter().cloned()),
                SectionBody::Data(table) => render_data(table, &mut lines)?,
            }
        }

        let eol = store.line_ending().as_str();
        let mut text = lines.join(eol);
        if store.trailing_newline() {
            text.push_str(eol);
        }
        Ok(text)
    }

    /// Render and write to `path` atomically via temp-file-then-rename. On
    /// any failure the destination is left untouched.
    pub fn write(&self, store: &SectionStore, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.render(store)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let io_err = |source| VboError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(text.as_bytes()).map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit the data section: blank padding, the column-header row, then one
/// delimiter-joined line per row.
fn render_data(table: &DataTable, lines: &mut Vec<String>) -> Result<()> {
    let delimiter = table.delimiter() as char;

    for name in table.column_names() {
        check_field(name, "column name", "[data] header row", delimiter)?;
    }

    lines.extend(std::iter::repeat_n(String::new(), table.leading_blanks()));
    lines.push(table.header_line().to_string());

    let columns: Vec<(&str, &[String])> = table.iter().collect();
    for row in 0..table.row_count() {
        let mut fields = Vec::with_capacity(columns.len());
        for (name, values) in &columns {
            let value = values[row].as_str();
            check_field(value, "value", name, delimiter)?;
            fields.push(value);
        }
        lines.push(fields.join(&delimiter.to_string()));
    }

    lines.extend(std::iter::repeat_n(String::new(), table.trailing_blanks()));
    Ok(())
}

/// A field containing the delimiter or a line break would corrupt the
/// row/column structure of the output.
fn check_field(field: &str, kind: &str, context: &str, delimiter: char) -> Result<()> {
    if field.contains(delimiter) || field.contains('\n') || field.contains('\r') {
        return Err(VboError::Serialization(format!(
            "{kind} {field:?} in '{context}' contains the field delimiter or a line break"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Parser;

    const SAMPLE: &str = "[header]\ntime\nheading\n\n[data]\ntime heading\n0 10.0\n1 20.0\n";

    #[test]
    fn test_render_round_trips_unmodified() {
        let store = Parser::new().parse_str(SAMPLE).unwrap();
        assert_eq!(Writer::new().render(&store).unwrap(), SAMPLE);
    }

    #[test]
    fn test_render_after_remove_column() {
        let mut store = Parser::new().parse_str(SAMPLE).unwrap();
        store.data_mut().unwrap().remove_column("heading").unwrap();
        assert_eq!(
            Writer::new().render(&store).unwrap(),
            "[header]\ntime\nheading\n\n[data]\ntime\n0\n1\n"
        );
    }

    #[test]
    fn test_render_rejects_value_containing_delimiter() {
        let mut store = Parser::new().parse_str(SAMPLE).unwrap();
        store
            .data_mut()
            .unwrap()
            .add_column("note", vec!["a b".to_string(), "c".to_string()])
            .unwrap();
        let err = Writer::new().render(&store).unwrap_err();
        assert!(matches!(err, VboError::Serialization(_)));
    }

    #[test]
    fn test_write_to_missing_directory_fails_without_creating_file() {
        let store = Parser::new().parse_str(SAMPLE).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist").join("out.vbo");

        let err = Writer::new().write(&store, &path).unwrap_err();
        assert!(matches!(err, VboError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_then_reread() {
        let store = Parser::new().parse_str(SAMPLE).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.vbo");

        Writer::new().write(&store, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
    }

    #[test]
    fn test_serialization_failure_leaves_destination_untouched() {
        let mut store = Parser::new().parse_str(SAMPLE).unwrap();
        store
            .data_mut()
            .unwrap()
            .add_column("note", vec!["a b".to_string(), "c".to_string()])
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.vbo");
        std::fs::write(&path, "previous contents").unwrap();

        assert!(Writer::new().write(&store, &path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous contents");
    }
}
