/// Core Module for querylog
///
/// Shared infrastructure used by every other module: the crate-wide error
/// type and its `Result` alias.

pub mod error;

// Re-export commonly used types for convenience
pub use error::{QueryLogError, Result};
