//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Process and shell execution with error handling
//! - `io` - File I/O with consistent error handling

pub mod command;
pub mod io;
