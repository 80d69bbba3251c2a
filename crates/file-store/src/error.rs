use thiserror::Error;

/// Result type for file store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the sandboxed file store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The path resolves outside the workspace root
    #[error("Access denied: '{path}' is outside of the workspace")]
    PathEscape { path: String },

    /// The path points into the store's own state directory
    #[error("Access denied: '{path}' is reserved for internal use")]
    ReservedPath { path: String },

    /// The path is empty, names the root itself, or is otherwise unusable
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("The file '{path}' does not exist")]
    NotFound { path: String },

    #[error("The file '{path}' already exists")]
    AlreadyExists { path: String },

    #[error("'{path}' is not a regular file")]
    NotAFile { path: String },

    #[error("The file '{path}' is not valid UTF-8 text")]
    InvalidUtf8 { path: String },

    #[error("IO error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by the requested path rather than by the file system.
    pub fn is_path_violation(&self) -> bool {
        matches!(
            self,
            Self::PathEscape { .. } | Self::ReservedPath { .. } | Self::InvalidPath { .. }
        )
    }
}
