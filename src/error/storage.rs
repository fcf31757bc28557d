/// Errors returned by [`StorageApi`](crate::storage::StorageApi) and the cache and lock
/// backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A stored or cached value could not be (de)serialized.
    #[error("malformed stored value: {0}")]
    SerdeError(#[from] serde_json::Error),
    /// The record does not exist.
    #[error("accumulated fee record {0} not found")]
    RecordNotFound(crate::types::FeeRecordId),
    /// The backend failed.
    #[error("storage backend failed: {0}")]
    InternalError(#[from] eyre::Error),
}
