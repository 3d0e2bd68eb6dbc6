//! Error types for blob store operations.

/// Result type for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Nothing is stored under the requested name.
    #[error("blob not found: {key}")]
    NotFound { key: String },

    /// The configured storage URL can't be turned into an object store.
    #[error("invalid blob storage url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The object name is not usable as a single path segment.
    #[error("invalid blob name '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error(transparent)]
    ObjectStore {
        #[from]
        source: object_store::Error,
    },
}

impl BlobError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
