//! File loading and parsing.

mod parser;
mod source;

pub use parser::{Parser, ParserConfig};
pub use source::SourceMetadata;
