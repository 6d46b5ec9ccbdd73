//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No scene node tagged with the given element id.
    #[error("Scene node not found: {0}")]
    NodeNotFound(String),

    /// An element could not be turned into a scene node.
    #[error("Invalid element data: {0}")]
    InvalidElement(String),

    /// A font could not be resolved.
    #[error("Font resolution failed: {0}")]
    FontLoad(String),

    /// Rasterization or delivery of an export failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// A document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] studio_core::StoreError),
}
