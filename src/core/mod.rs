// Public modules
pub mod context;
pub mod defaults;
pub mod deploy;
pub mod error;
pub mod git;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod steps;
pub mod sync;

// Internal modules - not part of public API
pub(crate) mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
