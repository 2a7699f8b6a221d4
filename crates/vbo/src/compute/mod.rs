//! Column computation: the contract-enforcing engine and the built-in
//! derived-channel functions layered on top of it.

pub mod builtins;
mod engine;
mod format;

pub use engine::ComputeEngine;
pub use format::{format_heading, hhmmsscc_to_milliseconds, zero_pad};
