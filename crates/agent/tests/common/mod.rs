#![allow(dead_code)]

use async_trait::async_trait;
use file_agent_core::{
    AgentConfig, Completion, CompletionRequest, CompletionService, EngineError, FileAgent, Role,
};
use file_agent_indexer::{Workspace, WorkspaceOptions};
use file_agent_protocol::ToolCall;
use file_agent_tools::ToolRegistry;
use file_agent_vector_store::{Embedder, HashingEmbedder, VectorStoreError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

type Script = Box<dyn Fn(&CompletionRequest, usize) -> Result<Completion, EngineError> + Send + Sync>;

/// Completion service driven by a closure of (request, call index).
pub struct ScriptedService {
    model: String,
    script: Script,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedService {
    pub fn new(
        script: impl Fn(&CompletionRequest, usize) -> Result<Completion, EngineError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            model: "scripted".to_string(),
            script: Box::new(script),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replies in order; the last one repeats.
    pub fn replies(replies: Vec<Completion>) -> Self {
        let queue = Mutex::new(VecDeque::from(replies));
        Self::new(move |_, _| {
            let mut queue = queue.lock().unwrap();
            let next = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            Ok(next.expect("script ran out of replies"))
        })
    }

    /// Classifier that always answers `label`.
    pub fn label(label: &str) -> Self {
        let label = label.to_string();
        Self::new(move |_, _| Ok(Completion::Answer(label.clone())))
    }

    pub fn failing() -> Self {
        Self::new(|_, _| {
            Err(EngineError::Status {
                status: 503,
                body: "overloaded".into(),
            })
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, EngineError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(&request, index)
    }
}

/// Hashing embedder that stalls on texts containing `SLOW`.
pub struct SlowEmbedder {
    inner: HashingEmbedder,
    delay: Duration,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: HashingEmbedder::new(64),
            delay,
        }
    }
}

#[async_trait]
impl Embedder for SlowEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, VectorStoreError> {
        if texts.iter().any(|t| t.contains("SLOW")) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.embed_batch(texts).await
    }
}

pub struct Harness {
    pub temp: TempDir,
    pub agent: FileAgent,
    pub classifier: Arc<ScriptedService>,
    pub reasoner: Arc<ScriptedService>,
}

impl Harness {
    pub fn new(classifier: ScriptedService, reasoner: ScriptedService) -> Self {
        Self::build(classifier, reasoner, Arc::new(HashingEmbedder::new(384)), |_| {})
    }

    pub fn build(
        classifier: ScriptedService,
        reasoner: ScriptedService,
        embedder: Arc<dyn Embedder>,
        configure: impl FnOnce(&mut AgentConfig),
    ) -> Self {
        let temp = TempDir::new().expect("temp dir");
        let mut config = AgentConfig::default();
        config.workspace_root = temp.path().join("ws");
        config.persist_index = false;
        configure(&mut config);

        let workspace = Workspace::open(
            &config.workspace_root,
            embedder,
            WorkspaceOptions {
                chunker: config.chunker,
                persist_index: config.persist_index,
            },
        )
        .expect("open workspace");
        let classifier = Arc::new(classifier);
        let reasoner = Arc::new(reasoner);
        let agent = FileAgent::new(
            ToolRegistry::new(workspace, config.top_k),
            classifier.clone(),
            reasoner.clone(),
            &config,
        );
        Self {
            temp,
            agent,
            classifier,
            reasoner,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        self.agent.workspace()
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(id, name, arguments)
}

pub fn tool_calls(calls: Vec<ToolCall>) -> Completion {
    Completion::ToolCalls { text: None, calls }
}

pub fn answer(text: &str) -> Completion {
    Completion::Answer(text.to_string())
}

/// Content of the most recent tool message the reasoner was shown.
pub fn last_tool_output(request: &CompletionRequest) -> Option<String> {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Tool)
        .and_then(|m| m.content.clone())
}
