//! Ordered section storage preserving original file formatting.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VboError};
use crate::table::DataTable;

/// Name of the section that is parsed into a [`DataTable`].
pub const DATA_SECTION: &str = "data";

/// Line-ending convention of a file, detected at parse time and reused when
/// writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Body of a section: raw lines for ordinary sections, a [`DataTable`] for
/// the `data` section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Raw(Vec<String>),
    Data(DataTable),
}

/// A named block of the file. The raw bracketed header line is retained so
/// unmodified sections write back byte-identically.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    name: String,
    header_line: String,
    body: SectionBody,
}

impl Section {
    pub(crate) fn raw(name: String, header_line: String, lines: Vec<String>) -> Self {
        Self {
            name,
            header_line,
            body: SectionBody::Raw(lines),
        }
    }

    pub(crate) fn data(name: String, header_line: String, table: DataTable) -> Self {
        Self {
            name,
            header_line,
            body: SectionBody::Data(table),
        }
    }

    /// Lowercased section name without brackets.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bracketed header line exactly as it appeared in the file.
    pub fn header_line(&self) -> &str {
        &self.header_line
    }

    pub fn body(&self) -> &SectionBody {
        &self.body
    }

    /// Raw body lines, `None` for the data section.
    pub fn lines(&self) -> Option<&[String]> {
        match &self.body {
            SectionBody::Raw(lines) => Some(lines),
            SectionBody::Data(_) => None,
        }
    }

    pub fn lines_mut(&mut self) -> Option<&mut Vec<String>> {
        match &mut self.body {
            SectionBody::Raw(lines) => Some(lines),
            SectionBody::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataTable> {
        match &self.body {
            SectionBody::Data(table) => Some(table),
            SectionBody::Raw(_) => None,
        }
    }

    pub fn as_data_mut(&mut self) -> Option<&mut DataTable> {
        match &mut self.body {
            SectionBody::Data(table) => Some(table),
            SectionBody::Raw(_) => None,
        }
    }
}

/// Ordered mapping of section name to section content, plus the file-level
/// formatting metadata needed to reassemble the file byte-identically.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionStore {
    preamble: Vec<String>,
    sections: IndexMap<String, Section>,
    line_ending: LineEnding,
    trailing_newline: bool,
}

impl SectionStore {
    pub(crate) fn new(
        preamble: Vec<String>,
        sections: IndexMap<String, Section>,
        line_ending: LineEnding,
        trailing_newline: bool,
    ) -> Self {
        Self {
            preamble,
            sections,
            line_ending,
            trailing_newline,
        }
    }

    /// Lines appearing before the first section header.
    pub fn preamble(&self) -> &[String] {
        &self.preamble
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.get_mut(name)
    }

    /// The `[data]` section's table, when the file has one.
    pub fn data(&self) -> Option<&DataTable> {
        self.sections.get(DATA_SECTION).and_then(Section::as_data)
    }

    pub fn data_mut(&mut self) -> Option<&mut DataTable> {
        self.sections.get_mut(DATA_SECTION).and_then(Section::as_data_mut)
    }

    /// Sections in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    /// Append a new raw section at the end of the file.
    pub fn insert_raw(&mut self, name: &str, lines: Vec<String>) -> Result<()> {
        let name = name.to_lowercase();
        if self.sections.contains_key(&name) {
            return Err(VboError::DuplicateSection(name));
        }
        let header_line = format!("[{name}]");
        self.sections
            .insert(name.clone(), Section::raw(name, header_line, lines));
        Ok(())
    }

    /// Move a section so it sits immediately after `anchor`. Returns whether
    /// anything moved; a no-op when either section is absent.
    pub fn move_after(&mut self, name: &str, anchor: &str) -> bool {
        if name == anchor || !self.sections.contains_key(anchor) {
            return false;
        }
        let Some(index) = self.sections.get_index_of(name) else {
            return false;
        };
        let (key, section) = self.sections.shift_remove_index(index).unwrap();
        let anchor_index = self.sections.get_index_of(anchor).unwrap();
        self.sections.shift_insert(anchor_index + 1, key, section);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(names: &[&str]) -> SectionStore {
        let mut sections = IndexMap::new();
        for name in names {
            let name = name.to_string();
            sections.insert(
                name.clone(),
                Section::raw(name.clone(), format!("[{name}]"), vec![]),
            );
        }
        SectionStore::new(vec![], sections, LineEnding::Lf, true)
    }

    #[test]
    fn test_get_by_name() {
        let store = store_with(&["header", "comments"]);
        assert!(store.get("header").is_some());
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_insert_raw_duplicate() {
        let mut store = store_with(&["avi"]);
        let err = store.insert_raw("avi", vec![]).unwrap_err();
        assert!(matches!(err, VboError::DuplicateSection(name) if name == "avi"));
    }

    #[test]
    fn test_move_after() {
        let mut store = store_with(&["header", "laptiming", "data", "avi"]);
        assert!(store.move_after("avi", "laptiming"));
        let order: Vec<&str> = store.iter().map(Section::name).collect();
        assert_eq!(order, ["header", "laptiming", "avi", "data"]);
    }

    #[test]
    fn test_move_after_missing_is_noop() {
        let mut store = store_with(&["header", "data"]);
        assert!(!store.move_after("avi", "header"));
        assert!(!store.move_after("header", "laptiming"));
        let order: Vec<&str> = store.iter().map(Section::name).collect();
        assert_eq!(order, ["header", "data"]);
    }
}
