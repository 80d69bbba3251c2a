//! # File Agent Vector Store
//!
//! Embedding and nearest-neighbour retrieval over workspace file chunks.
//!
//! ## Features
//!
//! - **Pluggable embedders**: local feature hashing or an OpenAI-compatible HTTP service
//! - **Per-file replacement**: a file's entries are swapped in one critical section
//! - **Deterministic ranking**: cosine similarity, ties broken by insertion order
//! - **Persistent snapshots** written atomically as JSON
//!
//! ## Architecture
//!
//! ```text
//! TextSpan[]
//!     │
//!     ├──> Embedder (hashing | http)
//!     │      └─> Vec<f32>[dimension]
//!     │
//!     ├──> VectorStore (RwLock<entries>)
//!     │      └─> brute-force cosine search
//!     │
//!     └──> Snapshot
//!            └─> .file-agent/index.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use file_agent_text_chunker::{Chunker, ChunkerConfig};
//! use file_agent_vector_store::{HashingEmbedder, VectorStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = VectorStore::new(Arc::new(HashingEmbedder::new(384)));
//!     let chunker = Chunker::new(ChunkerConfig::default())?;
//!
//!     let content = "One of the main dangers of AI is algorithmic bias.";
//!     store.upsert("ai.txt", content, chunker.chunk(content)).await?;
//!
//!     for hit in store.query("dangers of artificial intelligence", 3).await? {
//!         println!("{}: {:.3}", hit.path, hit.score);
//!     }
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod store;
mod types;

pub use embeddings::{
    cosine_similarity, Embedder, EmbeddingConfig, EmbeddingMode, HashingEmbedder,
    HttpEmbedder, HttpEmbedderConfig,
};
pub use error::{Result, VectorStoreError};
pub use store::{content_hash, VectorStore};
pub use types::{EmbeddedChunk, IndexEntry, SearchHit};

// Re-export chunker types for convenience
pub use file_agent_text_chunker::TextSpan;
