use crate::types::PhotoId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Photo not found: {0}")]
    NotFound(PhotoId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
