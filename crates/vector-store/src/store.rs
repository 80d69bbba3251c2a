use crate::embeddings::{cosine_similarity, Embedder};
use crate::error::{Result, VectorStoreError};
use crate::types::{EmbeddedChunk, IndexEntry, SearchHit};
use file_agent_text_chunker::TextSpan;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tempfile::NamedTempFile;

const SNAPSHOT_VERSION: u32 = 1;

/// Hex SHA-256 of file content, used to skip unchanged files on sync.
#[must_use]
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct IndexState {
    entries: Vec<IndexEntry>,
    hashes: BTreeMap<String, String>,
    next_seq: u64,
}

impl IndexState {
    fn drop_path(&mut self, path: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.path != path);
        self.hashes.remove(path);
        before - self.entries.len()
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    model_id: String,
    dimension: usize,
    #[serde(flatten)]
    state: IndexState,
}

/// In-memory vector index over workspace chunks with brute-force cosine search.
pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    state: RwLock<IndexState>,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            state: RwLock::new(IndexState::default()),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Embed every span. Fails as a whole when any vector cannot be produced.
    pub async fn embed_spans(&self, spans: Vec<TextSpan>) -> Result<Vec<EmbeddedChunk>> {
        if spans.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = spans.iter().map(|span| span.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != spans.len() {
            return Err(VectorStoreError::embedding(format!(
                "Embedder returned {} vectors for {} spans",
                vectors.len(),
                spans.len()
            )));
        }
        let expected = self.embedder.dimension();
        if let Some(bad) = vectors.iter().find(|vector| vector.len() != expected) {
            return Err(VectorStoreError::InvalidDimension {
                expected,
                actual: bad.len(),
            });
        }
        Ok(spans
            .into_iter()
            .zip(vectors)
            .map(|(span, vector)| EmbeddedChunk { span, vector })
            .collect())
    }

    /// Swap the entries of `path` for `embedded` in one critical section.
    pub fn replace(&self, path: &str, hash: &str, embedded: Vec<EmbeddedChunk>) -> Result<()> {
        let expected = self.embedder.dimension();
        if let Some(bad) = embedded.iter().find(|chunk| chunk.vector.len() != expected) {
            return Err(VectorStoreError::InvalidDimension {
                expected,
                actual: bad.vector.len(),
            });
        }

        let count = embedded.len();
        let mut state = self.write_state();
        state.drop_path(path);
        for chunk in embedded {
            let seq = state.next_seq;
            state.next_seq += 1;
            state.entries.push(IndexEntry {
                path: path.to_string(),
                chunk_index: chunk.span.index,
                start: chunk.span.start,
                end: chunk.span.end,
                text: chunk.span.text,
                vector: chunk.vector,
                seq,
            });
        }
        state.hashes.insert(path.to_string(), hash.to_string());
        drop(state);

        log::debug!("Indexed {count} chunks for '{path}'");
        Ok(())
    }

    pub async fn upsert(&self, path: &str, content: &str, spans: Vec<TextSpan>) -> Result<()> {
        let embedded = self.embed_spans(spans).await?;
        self.replace(path, &content_hash(content), embedded)
    }

    /// Purge every entry for `path`. Returns the number of entries removed.
    pub fn remove(&self, path: &str) -> usize {
        let removed = self.write_state().drop_path(path);
        if removed > 0 {
            log::debug!("Removed {removed} chunks for '{path}'");
        }
        removed
    }

    /// Indexed paths that are not in `live`, sorted.
    pub fn stale_paths(&self, live: &BTreeSet<String>) -> Vec<String> {
        let state = self.read_state();
        state
            .hashes
            .keys()
            .chain(state.entries.iter().map(|entry| &entry.path))
            .filter(|path| !live.contains(*path))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Top `k` entries most similar to `text`.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(text).await?;
        Ok(self.search_vector(&vector, k))
    }

    /// Rank by descending similarity; equal scores keep insertion order.
    #[must_use]
    pub fn search_vector(&self, vector: &[f32], k: usize) -> Vec<SearchHit> {
        let state = self.read_state();
        let mut scored: Vec<(f32, &IndexEntry)> = state
            .entries
            .iter()
            .map(|entry| (cosine_similarity(vector, &entry.vector), entry))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.seq.cmp(&b.1.seq)));
        scored.truncate(k);
        scored
            .into_iter()
            .map(|(score, entry)| SearchHit {
                path: entry.path.clone(),
                chunk_index: entry.chunk_index,
                text: entry.text.clone(),
                score,
            })
            .collect()
    }

    /// Content hash the entries of `path` were built from.
    pub fn indexed_hash(&self, path: &str) -> Option<String> {
        self.read_state().hashes.get(path).cloned()
    }

    /// Paths with at least one recorded hash, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.read_state().hashes.keys().cloned().collect()
    }

    pub fn entries_for(&self, path: &str) -> Vec<IndexEntry> {
        self.read_state()
            .entries
            .iter()
            .filter(|entry| entry.path == path)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().entries.is_empty()
    }

    /// Write a JSON snapshot atomically (temporary file in the same directory, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            model_id: self.embedder.model_id().to_string(),
            dimension: self.embedder.dimension(),
            state: self.read_state().clone(),
        };
        let data = serde_json::to_vec(&snapshot)?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|err| err.error)?;

        log::debug!(
            "Saved index snapshot ({} entries) to {}",
            snapshot.state.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Load a snapshot built with the same embedder.
    pub fn load(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let snapshot: Snapshot = serde_json::from_slice(&data)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(VectorStoreError::IncompatibleSnapshot(format!(
                "version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        if snapshot.model_id != embedder.model_id() || snapshot.dimension != embedder.dimension()
        {
            return Err(VectorStoreError::IncompatibleSnapshot(format!(
                "built with {} ({} dims), current embedder is {} ({} dims)",
                snapshot.model_id,
                snapshot.dimension,
                embedder.model_id(),
                embedder.dimension()
            )));
        }
        if let Some(bad) = snapshot
            .state
            .entries
            .iter()
            .find(|entry| entry.vector.len() != snapshot.dimension)
        {
            return Err(VectorStoreError::InvalidDimension {
                expected: snapshot.dimension,
                actual: bad.vector.len(),
            });
        }

        log::info!(
            "Loaded {} indexed chunks from {}",
            snapshot.state.entries.len(),
            path.display()
        );
        Ok(Self {
            embedder,
            state: RwLock::new(snapshot.state),
        })
    }

    /// Load the snapshot at `path`, or start empty when it is missing or unusable.
    pub fn load_or_new(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::new(embedder);
        }
        match Self::load(path, embedder.clone()) {
            Ok(store) => store,
            Err(err) => {
                log::warn!("Ignoring index snapshot {}: {err}", path.display());
                Self::new(embedder)
            }
        }
    }
}
