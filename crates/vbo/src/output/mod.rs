//! Serialization back to VBO text.

mod writer;

pub use writer::Writer;
