// Public modules
pub mod changelog;
pub mod config;
pub mod contributors;
pub mod engine;
pub mod error;
pub mod git;
pub mod github;
pub mod manifest;
pub mod release;
pub mod version;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
