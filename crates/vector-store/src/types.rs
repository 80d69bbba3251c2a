use file_agent_text_chunker::TextSpan;
use serde::{Deserialize, Serialize};

/// A chunk whose embedding has been computed but not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub span: TextSpan,
    pub vector: Vec<f32>,
}

/// One stored record. Identity is `(path, chunk_index)`; `seq` orders insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: String,
    pub chunk_index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub vector: Vec<f32>,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub path: String,
    pub chunk_index: usize,
    pub text: String,
    pub score: f32,
}
