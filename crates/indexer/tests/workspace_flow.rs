use async_trait::async_trait;
use file_agent_file_store::StoreError;
use file_agent_indexer::{Workspace, WorkspaceError, WorkspaceOptions};
use file_agent_vector_store::{Embedder, HashingEmbedder, VectorStoreError};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

/// Hashing embedder that refuses any text containing `POISON`.
struct PickyEmbedder(HashingEmbedder);

#[async_trait]
impl Embedder for PickyEmbedder {
    fn model_id(&self) -> &str {
        self.0.model_id()
    }

    fn dimension(&self) -> usize {
        self.0.dimension()
    }

    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> file_agent_vector_store::Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains("POISON")) {
            return Err(VectorStoreError::EmbeddingError("service unavailable".into()));
        }
        self.0.embed_batch(texts).await
    }
}

fn workspace(temp: &TempDir) -> Workspace {
    Workspace::open(
        temp.path().join("ws"),
        Arc::new(PickyEmbedder(HashingEmbedder::new(128))),
        WorkspaceOptions::default(),
    )
    .expect("open workspace")
}

#[tokio::test]
async fn create_indexes_and_delete_purges() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp);

    ws.create_file("ai.txt", "One of the main dangers of AI is algorithmic bias.")
        .await
        .unwrap();
    let hits = ws.search("dangers of AI", 3).await.unwrap();
    assert_eq!(hits[0].path, "ai.txt");

    ws.delete_file("ai.txt").await.unwrap();
    assert!(ws.search("dangers of AI", 3).await.unwrap().is_empty());
    assert!(ws.vectors().indexed_hash("ai.txt").is_none());

    let err = ws.delete_file("ai.txt").await.unwrap_err();
    assert!(matches!(err, WorkspaceError::Store(StoreError::NotFound { .. })), "{err}");
}

#[tokio::test]
async fn update_and_append_reindex_content() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp);

    ws.create_file("notes.txt", "pasta").await.unwrap();
    ws.update_file("notes.txt", "guanciale").await.unwrap();
    assert_eq!(ws.read_file("notes.txt").await.unwrap(), "guanciale");

    ws.append_file("notes.txt", " pecorino").await.unwrap();
    assert_eq!(ws.read_file("notes.txt").await.unwrap(), "guanciale pecorino");

    let entries = ws.vectors().entries_for("notes.txt");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "guanciale pecorino");
}

#[tokio::test]
async fn embedding_failure_leaves_file_and_index_untouched() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp);

    let err = ws.create_file("bad.txt", "POISON pill").await.unwrap_err();
    assert!(err.is_embedding(), "{err}");
    assert!(ws.list_files().unwrap().is_empty());

    ws.create_file("good.txt", "safe words").await.unwrap();
    let before = ws.vectors().entries_for("good.txt");

    let err = ws.update_file("good.txt", "POISON words").await.unwrap_err();
    assert!(err.is_embedding(), "{err}");
    assert_eq!(ws.read_file("good.txt").await.unwrap(), "safe words");
    assert_eq!(ws.vectors().entries_for("good.txt"), before);

    let err = ws.append_file("good.txt", " POISON").await.unwrap_err();
    assert!(err.is_embedding(), "{err}");
    assert_eq!(ws.read_file("good.txt").await.unwrap(), "safe words");
}

#[tokio::test]
async fn escaping_paths_never_reach_the_index() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp);

    let err = ws.create_file("../outside.txt", "x").await.unwrap_err();
    assert!(matches!(err, WorkspaceError::Store(StoreError::PathEscape { .. })), "{err}");
    assert!(ws.vectors().is_empty());
    assert!(!temp.path().join("outside.txt").exists());
}

#[tokio::test]
async fn strict_create_keeps_existing_content() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp);

    ws.create_file("a.txt", "first").await.unwrap();
    let err = ws.create_file("a.txt", "second").await.unwrap_err();
    assert!(matches!(err, WorkspaceError::Store(StoreError::AlreadyExists { .. })), "{err}");
    assert_eq!(ws.read_file("a.txt").await.unwrap(), "first");
}

#[tokio::test]
async fn concurrent_appends_on_one_path_are_serialized() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp);
    ws.create_file("log.txt", "").await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let ws = ws.clone();
        tasks.push(tokio::spawn(async move {
            ws.append_file("log.txt", &format!("line {i}\n")).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let content = ws.read_file("log.txt").await.unwrap();
    assert_eq!(content.lines().count(), 16);
    for i in 0..16 {
        assert!(content.contains(&format!("line {i}\n")), "missing line {i}");
    }
}
