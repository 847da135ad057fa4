//! Structured logging to stderr and JSON result lines on stdout.

mod format;

pub use format::{OutputLine, StructuredLogger};
