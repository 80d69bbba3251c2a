use crate::error::{Result, WorkspaceError};
use crate::path_lock::PathLocks;
use crate::stats::SyncStats;
use file_agent_file_store::{FileStore, StoreError};
use file_agent_text_chunker::{Chunker, ChunkerConfig};
use file_agent_vector_store::{content_hash, EmbeddedChunk, Embedder, SearchHit, VectorStore};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const SNAPSHOT_FILE: &str = "index.json";

#[derive(Debug, Clone, Default)]
pub struct WorkspaceOptions {
    pub chunker: ChunkerConfig,
    /// Persist the index under the store's state directory after every mutation.
    pub persist_index: bool,
}

struct Inner {
    files: FileStore,
    vectors: VectorStore,
    chunker: Chunker,
    locks: PathLocks,
    snapshot_path: Option<PathBuf>,
}

/// Shared handle over one sandboxed workspace and its retrieval index.
///
/// Every mutation embeds the new content before the file is touched, then writes the file
/// and swaps the path's index entries. Writers on one path are serialized; readers share
/// the same per-path lock. Mutations run in a spawned task so a caller that stops waiting
/// does not leave a write half-done.
#[derive(Clone)]
pub struct Workspace {
    inner: Arc<Inner>,
}

impl Workspace {
    /// Open the workspace at `root`. With `persist_index`, a compatible snapshot is loaded.
    pub fn open(
        root: impl AsRef<Path>,
        embedder: Arc<dyn Embedder>,
        options: WorkspaceOptions,
    ) -> Result<Self> {
        let files = FileStore::open(root)?;
        let chunker = Chunker::new(options.chunker)?;

        let snapshot_path = options
            .persist_index
            .then(|| files.state_dir().join(SNAPSHOT_FILE));
        let vectors = match &snapshot_path {
            Some(path) => VectorStore::load_or_new(path, embedder),
            None => VectorStore::new(embedder),
        };

        Ok(Self {
            inner: Arc::new(Inner {
                files,
                vectors,
                chunker,
                locks: PathLocks::default(),
                snapshot_path,
            }),
        })
    }

    pub fn root(&self) -> &Path {
        self.inner.files.root()
    }

    pub fn files(&self) -> &FileStore {
        &self.inner.files
    }

    pub fn vectors(&self) -> &VectorStore {
        &self.inner.vectors
    }

    /// Create a new file and index it. Returns the normalized path.
    pub async fn create_file(&self, path: &str, content: &str) -> Result<String> {
        let key = self.inner.files.resolve(path)?.relative;
        let ws = self.clone();
        let content = content.to_string();
        spawn_mutation(async move { ws.create_locked(key, content).await }).await
    }

    /// Overwrite an existing file and re-index it.
    pub async fn update_file(&self, path: &str, content: &str) -> Result<String> {
        let key = self.inner.files.resolve(path)?.relative;
        let ws = self.clone();
        let content = content.to_string();
        spawn_mutation(async move { ws.update_locked(key, content).await }).await
    }

    /// Append to an existing file and re-index the combined content.
    pub async fn append_file(&self, path: &str, content: &str) -> Result<String> {
        let key = self.inner.files.resolve(path)?.relative;
        let ws = self.clone();
        let addition = content.to_string();
        spawn_mutation(async move { ws.append_locked(key, addition).await }).await
    }

    /// Delete a file and purge its index entries.
    pub async fn delete_file(&self, path: &str) -> Result<String> {
        let key = self.inner.files.resolve(path)?.relative;
        let ws = self.clone();
        spawn_mutation(async move { ws.delete_locked(key).await }).await
    }

    async fn create_locked(&self, key: String, content: String) -> Result<String> {
        let _guard = self.inner.locks.write(&key).await;
        if self.inner.files.exists(&key)? {
            return Err(StoreError::AlreadyExists { path: key }.into());
        }
        let embedded = self.embed(&content).await?;
        self.inner.files.create(&key, &content)?;
        self.commit(&key, &content, embedded)?;
        log::info!("Created '{key}'");
        Ok(key)
    }

    async fn update_locked(&self, key: String, content: String) -> Result<String> {
        let _guard = self.inner.locks.write(&key).await;
        self.inner.files.require_file(&key)?;
        let embedded = self.embed(&content).await?;
        self.inner.files.update(&key, &content)?;
        self.commit(&key, &content, embedded)?;
        log::info!("Updated '{key}'");
        Ok(key)
    }

    async fn append_locked(&self, key: String, addition: String) -> Result<String> {
        let _guard = self.inner.locks.write(&key).await;
        let mut combined = self.inner.files.read(&key)?;
        combined.push_str(&addition);
        let embedded = self.embed(&combined).await?;
        self.inner.files.append(&key, &addition)?;
        self.commit(&key, &combined, embedded)?;
        log::info!("Appended to '{key}'");
        Ok(key)
    }

    async fn delete_locked(&self, key: String) -> Result<String> {
        let _guard = self.inner.locks.write(&key).await;
        self.inner.files.delete(&key)?;
        self.inner.vectors.remove(&key);
        self.persist();
        log::info!("Deleted '{key}'");
        Ok(key)
    }

    pub async fn read_file(&self, path: &str) -> Result<String> {
        let key = self.inner.files.resolve(path)?.relative;
        let _guard = self.inner.locks.read(&key).await;
        Ok(self.inner.files.read(&key)?)
    }

    pub fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.inner.files.list()?)
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        Ok(self.inner.vectors.query(query, k).await?)
    }

    /// Bring the index in line with the files on disk.
    ///
    /// Entries for missing files are purged, files whose content hash changed are
    /// re-embedded and unchanged files are skipped. A file that cannot be read or embedded
    /// is reported in [`SyncStats::errors`] and left without entries.
    pub async fn sync(&self) -> Result<SyncStats> {
        let started = Instant::now();
        let mut stats = SyncStats::default();

        let paths = self.inner.files.list()?;
        let live: BTreeSet<String> = paths.iter().cloned().collect();
        stats.files = paths.len();

        // A file created after the listing is not stale; check again under its lock.
        for path in self.inner.vectors.stale_paths(&live) {
            let _guard = self.inner.locks.write(&path).await;
            if matches!(self.inner.files.exists(&path), Ok(true)) {
                continue;
            }
            self.inner.vectors.remove(&path);
            stats.removed += 1;
        }

        for path in &paths {
            let _guard = self.inner.locks.write(path).await;
            let content = match self.inner.files.read(path) {
                Ok(content) => content,
                Err(err) => {
                    log::warn!("Skipping '{path}' during sync: {err}");
                    stats.add_error(path, &err);
                    self.inner.vectors.remove(path);
                    continue;
                }
            };

            let hash = content_hash(&content);
            if self.inner.vectors.indexed_hash(path).as_deref() == Some(hash.as_str()) {
                stats.skipped += 1;
                continue;
            }

            match self.embed(&content).await {
                Ok(embedded) => {
                    let chunks = embedded.len();
                    self.inner.vectors.replace(path, &hash, embedded)?;
                    stats.add_indexed(chunks);
                }
                Err(err) => {
                    log::warn!("Failed to index '{path}': {err}");
                    stats.add_error(path, &err);
                    self.inner.vectors.remove(path);
                }
            }
        }

        self.persist();
        stats.time_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Synced {} files: {} indexed, {} unchanged, {} removed, {} errors ({} ms)",
            stats.files,
            stats.indexed,
            stats.skipped,
            stats.removed,
            stats.errors.len(),
            stats.time_ms
        );
        Ok(stats)
    }

    async fn embed(&self, content: &str) -> Result<Vec<EmbeddedChunk>> {
        let spans = self.inner.chunker.chunk(content);
        Ok(self.inner.vectors.embed_spans(spans).await?)
    }

    fn commit(&self, key: &str, content: &str, embedded: Vec<EmbeddedChunk>) -> Result<()> {
        self.inner
            .vectors
            .replace(key, &content_hash(content), embedded)?;
        self.persist();
        Ok(())
    }

    fn persist(&self) {
        let Some(path) = &self.inner.snapshot_path else {
            return;
        };
        if let Err(err) = self.inner.vectors.save(path) {
            log::warn!("Failed to persist index to {}: {err}", path.display());
        }
    }
}

async fn spawn_mutation<T>(op: impl Future<Output = Result<T>> + Send + 'static) -> Result<T>
where
    T: Send + 'static,
{
    tokio::spawn(op)
        .await
        .map_err(|err| WorkspaceError::Task(err.to_string()))?
}
