//! # File Agent File Store
//!
//! Every path handed to the store is resolved against a single workspace root. Anything
//! that resolves outside the root (parent segments, absolute paths, symbolic links) is
//! rejected with [`StoreError::PathEscape`] before the file system is touched.
//!
//! ## Write discipline
//!
//! ```text
//! content ──> .<name>.tmp-XXXX (same directory) ──fsync──> rename ──> <name>
//! ```
//!
//! A reader never observes a half-written file: it sees either the previous content or
//! the new one.
//!
//! ## Example
//!
//! ```no_run
//! use file_agent_file_store::FileStore;
//!
//! # fn main() -> file_agent_file_store::Result<()> {
//! let store = FileStore::open("./workspace")?;
//! store.create("notes/todo.txt", "buy milk")?;
//! assert_eq!(store.read("notes/todo.txt")?, "buy milk");
//! assert!(store.read("../etc/passwd").is_err());
//! # Ok(())
//! # }
//! ```

mod error;
mod paths;
mod store;

pub use error::{Result, StoreError};
pub use paths::{is_temp_artifact, ResolvedPath, STATE_DIR_NAME};
pub use store::FileStore;
