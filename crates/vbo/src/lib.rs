//! VBO: round-trip parser, editor, and writer for Racelogic VBO telemetry
//! files.
//!
//! A VBO file is an ordered set of bracket-headed sections; the `[data]`
//! section holds delimiter-separated telemetry rows under a column-header
//! row. This crate parses a file into structured sections and columns,
//! derives new columns from existing ones, and writes everything back.
//!
//! # Core Principles
//!
//! - **Formatting-preserving**: parse-then-write reproduces the original
//!   bytes; only the data section is regenerated, everything else is emitted
//!   verbatim
//! - **Strict compute contract**: a compute function works on a copy and its
//!   result is only committed after the engine has verified it added exactly
//!   one well-formed column
//! - **All-or-nothing mutation**: a failing operation leaves the document
//!   exactly as it was
//!
//! # Example
//!
//! ```no_run
//! use vbo::{OversteerOptions, VboFile};
//!
//! let mut file = VboFile::load("session.vbo").unwrap();
//! file.add_oversteer_column(&OversteerOptions::default()).unwrap();
//! file.write("session_oversteer.vbo").unwrap();
//! ```

pub mod compute;
pub mod error;
pub mod input;
pub mod output;
pub mod section;
pub mod table;

mod vbo;

pub use crate::vbo::{AviOptions, VboFile};
pub use compute::ComputeEngine;
pub use compute::builtins::{
    AviTimeOptions, FuelConsumptionOptions, GpsHeadingOptions, OversteerOptions,
    RotationSpeedOptions,
};
pub use error::{Result, VboError};
pub use input::{Parser, ParserConfig, SourceMetadata};
pub use output::Writer;
pub use section::{LineEnding, Section, SectionBody, SectionStore};
pub use table::DataTable;
