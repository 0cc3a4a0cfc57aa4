//! Error types for simplelru

use thiserror::Error;

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Capacity must be a positive number of entries
    #[error("invalid capacity: {0} (must be greater than 0)")]
    InvalidCapacity(usize),

    /// Key is not present in the cache
    #[error("key not found")]
    KeyNotFound,

    /// Handle does not refer to a node linked into the ordering list.
    ///
    /// Seeing this from the engine means the index and the list disagree.
    #[error("invalid handle: node is not linked into the list")]
    InvalidHandle,
}
