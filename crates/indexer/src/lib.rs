//! # File Agent Indexer
//!
//! The [`Workspace`] handle: a sandboxed file store and its retrieval index, kept consistent.
//!
//! ## Pipeline
//!
//! ```text
//! create / update / append
//!     │
//!     ├──> per-path write lock
//!     │
//!     ├──> Chunker (grapheme windows)
//!     │      └─> TextSpan[]
//!     │
//!     ├──> Embedder (before any disk write)
//!     │
//!     ├──> FileStore (temp file + atomic rename)
//!     │
//!     └──> VectorStore::replace
//!            └─> .file-agent/index.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use file_agent_indexer::{Workspace, WorkspaceOptions};
//! use file_agent_vector_store::HashingEmbedder;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let workspace = Workspace::open(
//!         "./workspace",
//!         Arc::new(HashingEmbedder::new(384)),
//!         WorkspaceOptions::default(),
//!     )?;
//!     let stats = workspace.sync().await?;
//!     println!("Indexed {} files, {} chunks", stats.indexed, stats.chunks);
//!
//!     workspace.create_file("notes.txt", "Buy eggs").await?;
//!     let hits = workspace.search("eggs", 3).await?;
//!     println!("{} hits", hits.len());
//!     Ok(())
//! }
//! ```

mod error;
mod path_lock;
mod stats;
mod workspace;

pub use error::{Result, WorkspaceError};
pub use path_lock::path_lock_wait_ms_max;
pub use stats::SyncStats;
pub use workspace::{Workspace, WorkspaceOptions};
