use docstore_blob::BlobError;

/// Error taxonomy for document operations.
///
/// `NotFound` and `Forbidden` are policy outcomes the aggregate manager
/// produces itself; the storage variants wrap backend failures that are safe
/// to retry at a higher layer. `InconsistentState` marks a checksum/URI pair
/// violation that must never occur; it is surfaced loudly instead of being
/// silently repaired.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("access denied")]
    Forbidden,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read from content store: {0}")]
    StorageRead(#[source] BlobError),
    #[error("failed to write to content store: {0}")]
    StorageWrite(#[source] BlobError),
    #[error("inconsistent content state: {0}")]
    InconsistentState(String),
    #[error("failed to read metadata row: {0}")]
    RowRead(#[source] std::io::Error),
    #[error("failed to write metadata row: {0}")]
    RowWrite(#[source] std::io::Error),
    #[error("failed to serialise metadata row: {0}")]
    RowSerialization(#[source] serde_json::Error),
    #[error("failed to deserialise metadata row: {0}")]
    RowDeserialization(#[source] serde_json::Error),
}

pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

impl From<docstore_uuid::UuidError> for DocumentError {
    fn from(e: docstore_uuid::UuidError) -> Self {
        DocumentError::InvalidInput(e.to_string())
    }
}

impl From<docstore_types::TextError> for DocumentError {
    fn from(e: docstore_types::TextError) -> Self {
        DocumentError::InvalidInput(e.to_string())
    }
}
