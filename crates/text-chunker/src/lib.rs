//! # File Agent Text Chunker
//!
//! Splits file text into overlapping, fixed-size windows for embedding.
//!
//! ## Windowing
//!
//! ```text
//! text:    |--------------------------------------------|
//! span 0:  |==========|
//! span 1:         |==========|          step = size - overlap
//! span 2:                |==========|
//! span 3:                       |===================|   (last span ends at the text end)
//! ```
//!
//! Sizes are counted in grapheme clusters, so a window never cuts a user-perceived
//! character in half. The same input always yields the same spans in the same order.
//!
//! ## Example
//!
//! ```rust
//! use file_agent_text_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig { chunk_size: 8, chunk_overlap: 2 }).unwrap();
//! let spans = chunker.chunk("abcdefghijklmn");
//! assert_eq!(spans[0].text, "abcdefgh");
//! assert_eq!(spans[1].text, "ghijklmn");
//! ```

mod chunker;
mod config;
mod error;
mod types;

pub use chunker::Chunker;
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use types::TextSpan;
