use file_agent_file_store::StoreError;
use file_agent_text_chunker::ChunkerError;
use file_agent_vector_store::VectorStoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkspaceError>;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Chunker error: {0}")]
    Chunker(#[from] ChunkerError),

    #[error("Index error: {0}")]
    Index(#[from] VectorStoreError),

    /// A spawned mutation task panicked or was aborted.
    #[error("Workspace task failed: {0}")]
    Task(String),
}

impl WorkspaceError {
    /// True when the failure came from producing embeddings.
    pub fn is_embedding(&self) -> bool {
        matches!(
            self,
            Self::Index(
                VectorStoreError::EmbeddingError(_) | VectorStoreError::InvalidDimension { .. }
            )
        )
    }
}
