use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Incompatible index snapshot: {0}")]
    IncompatibleSnapshot(String),

    #[error("{0}")]
    Other(String),
}

impl VectorStoreError {
    pub(crate) fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingError(msg.into())
    }
}
