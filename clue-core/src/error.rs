//! Error types for clue-core.

use thiserror::Error;

/// Result type alias for clue operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
///
/// The clustering engine itself never fails; these errors come from
/// validating hits and configurations supplied from outside.
#[derive(Error, Debug)]
pub enum Error {
    /// Hit with unusable contents.
    #[error("invalid hit {id}: {reason}")]
    InvalidHit { id: u32, reason: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
