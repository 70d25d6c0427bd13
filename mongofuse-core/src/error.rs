use crate::store::StoreError;

/// Errors surfaced by the projection engine.
///
/// Store failures pass through unchanged; retry and backoff belong to the
/// store client, not this layer.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("no such entry")]
    NotFound,
    #[error("invalid path")]
    InvalidPath,
    #[error("invalid document body: {0}")]
    InvalidDocument(String),
    #[error("operation not supported")]
    Unsupported,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, FsError>;
