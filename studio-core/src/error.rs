//! Error types for document store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while mutating the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Slide index outside the deck bounds.
    #[error("Slide index out of range: {0}")]
    SlideOutOfRange(usize),

    /// Element not found on the current slide.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Invalid element operation.
    #[error("Invalid operation on element: {0}")]
    InvalidOperation(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
