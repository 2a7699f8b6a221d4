//! Property-based tests for the VBO parser, writer, and table invariants.
//!
//! These use proptest to generate well-formed data sections and verify that
//! the core guarantees hold under all inputs:
//!
//! 1. **Round-trip**: parse-then-render reproduces the input bytes
//! 2. **Row-count invariant**: every column keeps the table's row count
//!    through any sequence of add/remove operations
//! 3. **All-or-nothing**: contract-violating compute functions never leave a
//!    trace in the document

use proptest::prelude::*;

use vbo::{Parser, VboFile, Writer};

/// Unique lowercase column names.
fn column_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z][a-z_]{1,9}", 1..5)
        .prop_map(|names| names.into_iter().collect())
}

/// Numeric field values that cannot contain a delimiter.
fn field_value() -> impl Strategy<Value = String> {
    "[+-]?[0-9]{1,4}(\\.[0-9]{1,3})?"
}

/// A well-formed space-delimited `[data]` section.
fn data_section_text() -> impl Strategy<Value = String> {
    (column_names(), 1usize..12).prop_flat_map(|(names, nrows)| {
        let ncols = names.len();
        prop::collection::vec(
            prop::collection::vec(field_value(), ncols..=ncols),
            nrows..=nrows,
        )
        .prop_map(move |rows| {
            let mut text = String::from("[data]\n");
            text.push_str(&names.join(" "));
            text.push('\n');
            for row in rows {
                text.push_str(&row.join(" "));
                text.push('\n');
            }
            text
        })
    })
}

proptest! {
    /// Parsing a well-formed file and writing it back without mutation
    /// reproduces the original bytes.
    #[test]
    fn prop_round_trip_is_byte_identical(text in data_section_text()) {
        let store = Parser::new().parse_str(&text).unwrap();
        prop_assert_eq!(Writer::new().render(&store).unwrap(), text);
    }

    /// The same holds with CRLF line endings.
    #[test]
    fn prop_round_trip_is_byte_identical_crlf(text in data_section_text()) {
        let crlf = text.replace('\n', "\r\n");
        let store = Parser::new().parse_str(&crlf).unwrap();
        prop_assert_eq!(Writer::new().render(&store).unwrap(), crlf);
    }

    /// After any sequence of column adds and removes, every column's length
    /// equals the table's row count.
    #[test]
    fn prop_columns_share_row_count(text in data_section_text(), ops in prop::collection::vec(0u8..3, 0..8)) {
        let store = Parser::new().parse_str(&text).unwrap();
        let mut table = store.data().unwrap().clone();
        let nval = table.row_count();

        for (i, &op) in ops.iter().enumerate() {
            match op {
                0 => {
                    let _ = table.add_column(format!("extra_{i}"), vec!["0".to_string(); nval]);
                }
                1 => {
                    let first = table.column_names().next().map(String::from);
                    if let Some(name) = first {
                        let _ = table.remove_column(&name);
                    }
                }
                _ => {
                    let _ = table.remove_column("never_present");
                }
            }

            let row_count = table.row_count();
            for (_, values) in table.iter() {
                prop_assert_eq!(values.len(), row_count);
            }
        }
    }

    /// A compute function that adds two columns violates the contract and
    /// must leave the document byte-for-byte unchanged.
    #[test]
    fn prop_contract_violation_never_mutates(text in data_section_text()) {
        let mut file = VboFile::parse_str(&text).unwrap();
        let before = file.render().unwrap();

        let result = file.add_computed_column("zz_derived", |mut t| {
            let n = t.row_count();
            t.add_column("zz_derived", vec!["0".to_string(); n])?;
            t.add_column("zz_stray", vec!["0".to_string(); n])?;
            Ok(t)
        });

        prop_assert!(result.is_err());
        prop_assert_eq!(file.render().unwrap(), before);
    }

    /// Adding then removing a column restores the original column set.
    #[test]
    fn prop_add_then_remove_restores_columns(text in data_section_text()) {
        let mut file = VboFile::parse_str(&text).unwrap();
        prop_assume!(!file.data().unwrap().has_column("zz_derived"));
        let before = file.render().unwrap();

        file.add_computed_column("zz_derived", |mut t| {
            let n = t.row_count();
            t.add_column("zz_derived", vec!["0".to_string(); n])?;
            Ok(t)
        }).unwrap();
        file.remove_column("zz_derived").unwrap();

        prop_assert_eq!(file.render().unwrap(), before);
    }
}
