use serde::{Deserialize, Serialize};

/// Outcome of a startup sync between the file store and the index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Files found in the workspace
    pub files: usize,

    /// Files (re)embedded because their content changed
    pub indexed: usize,

    /// Files whose indexed hash still matched
    pub skipped: usize,

    /// Paths purged because the file no longer exists
    pub removed: usize,

    /// Chunks written during this sync
    pub chunks: usize,

    /// Per-file failures, `path: reason`
    pub errors: Vec<String>,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl SyncStats {
    pub fn add_indexed(&mut self, chunks: usize) {
        self.indexed += 1;
        self.chunks += chunks;
    }

    pub fn add_error(&mut self, path: &str, error: impl std::fmt::Display) {
        self.errors.push(format!("{path}: {error}"));
    }
}
