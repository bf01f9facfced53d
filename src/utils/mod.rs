//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Diagnostics from captured process output
//! - `io` - File I/O with consistent error handling
//! - `shell` - Argument quoting for displayed command lines
//! - `validation` - Input validation helpers

pub mod command;
pub mod io;
pub mod shell;
pub mod validation;
