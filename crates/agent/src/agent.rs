use crate::config::AgentConfig;
use crate::engine::{CompletionService, OpenAiChatClient};
use crate::error::{AgentError, Result};
use crate::guardrail::{Guardrail, GuardrailState, Verdict};
use crate::orchestrator::{LoopFailure, LoopState, Orchestrator};
use crate::prompts::{EMPTY_REQUEST, REFUSAL};
use crate::transcript::Transcript;
use file_agent_indexer::{Workspace, WorkspaceError, WorkspaceOptions};
use file_agent_tools::ToolRegistry;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Completed,
    Rejected,
    Failed,
}

/// Everything one request produced.
#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub status: InteractionStatus,
    /// Text for the person who asked: the final answer, the refusal or a failure message.
    pub answer: String,
    pub guardrail: GuardrailState,
    pub verdict: Option<Verdict>,
    pub transcript: Transcript,
    /// Reasoning calls made.
    pub iterations: usize,
    /// Where the tool loop stopped; `None` when the request never reached it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_state: Option<LoopState>,
    /// Internal failure detail, when `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Classifies a request, then drives the tool loop over one shared workspace.
///
/// A `FileAgent` is cheap to share behind an `Arc`; concurrent interactions run against the
/// same [`Workspace`] and rely on its per-path locks.
pub struct FileAgent {
    guardrail: Guardrail,
    orchestrator: Orchestrator,
}

impl FileAgent {
    pub fn new(
        tools: ToolRegistry,
        classifier: Arc<dyn CompletionService>,
        reasoner: Arc<dyn CompletionService>,
        config: &AgentConfig,
    ) -> Self {
        let guardrail = Guardrail::new(
            classifier,
            config.guardrail,
            config.classifier.temperature,
            config.classifier.timeout(),
        );
        let orchestrator = Orchestrator::new(
            reasoner,
            tools,
            config.orchestrator,
            config.reasoner.temperature,
            config.reasoner.timeout(),
        );
        Self {
            guardrail,
            orchestrator,
        }
    }

    /// Open the configured workspace, bring its index up to date and connect both
    /// completion services.
    pub async fn from_config(config: &AgentConfig) -> Result<Self> {
        config.validate()?;
        let embedder = config
            .embedding
            .build()
            .map_err(|err| AgentError::Workspace(WorkspaceError::Index(err)))?;
        let workspace = Workspace::open(
            &config.workspace_root,
            embedder,
            WorkspaceOptions {
                chunker: config.chunker,
                persist_index: config.persist_index,
            },
        )?;
        let stats = workspace.sync().await?;
        for error in &stats.errors {
            log::warn!("Not indexed: {error}");
        }

        let api_key = config.api.api_key();
        if api_key.is_none() {
            log::warn!(
                "{} is not set; completion calls will be sent without credentials",
                config.api.api_key_env
            );
        }
        let classifier = OpenAiChatClient::new(
            &config.api.base_url,
            config.classifier.model.clone(),
            api_key.clone(),
            config.classifier.timeout(),
        )?;
        let reasoner = OpenAiChatClient::new(
            &config.api.base_url,
            config.reasoner.model.clone(),
            api_key,
            config.reasoner.timeout(),
        )?;

        Ok(Self::new(
            ToolRegistry::new(workspace, config.top_k),
            Arc::new(classifier),
            Arc::new(reasoner),
            config,
        ))
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.orchestrator.tools()
    }

    pub fn workspace(&self) -> &Workspace {
        self.tools().workspace()
    }

    pub async fn handle(&self, request: &str) -> Interaction {
        self.handle_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Run one interaction. Cancelling `cancel` stops the loop before its next iteration.
    pub async fn handle_with_cancel(
        &self,
        request: &str,
        cancel: &CancellationToken,
    ) -> Interaction {
        let started = Instant::now();
        let mut transcript = Transcript::new(request);

        if request.trim().is_empty() {
            log::info!("Empty request; nothing to classify");
            return Interaction {
                status: InteractionStatus::Rejected,
                answer: EMPTY_REQUEST.to_string(),
                guardrail: GuardrailState::Init,
                verdict: None,
                transcript,
                iterations: 0,
                loop_state: None,
                error: None,
                elapsed_ms: elapsed_ms(started),
            };
        }

        let verdict = match self.guardrail.classify(request).await {
            Ok(verdict) => verdict,
            Err(err) => {
                log::error!("Interaction failed before the loop: {err}");
                return Interaction {
                    status: InteractionStatus::Failed,
                    answer: err.user_message().to_string(),
                    guardrail: GuardrailState::Init,
                    verdict: None,
                    transcript,
                    iterations: 0,
                    loop_state: None,
                    error: Some(err.to_string()),
                    elapsed_ms: elapsed_ms(started),
                };
            }
        };

        if !verdict.in_scope {
            return Interaction {
                status: InteractionStatus::Rejected,
                answer: REFUSAL.to_string(),
                guardrail: verdict.state(),
                verdict: Some(verdict),
                transcript,
                iterations: 0,
                loop_state: None,
                error: None,
                elapsed_ms: elapsed_ms(started),
            };
        }

        let guardrail = verdict.state();
        match self.orchestrator.run(&mut transcript, cancel).await {
            Ok(report) => {
                log::info!(
                    "Interaction completed in {} iteration(s), {} tool call(s)",
                    report.iterations,
                    transcript.tool_results().count()
                );
                Interaction {
                    status: InteractionStatus::Completed,
                    answer: report.answer,
                    guardrail,
                    verdict: Some(verdict),
                    transcript,
                    iterations: report.iterations,
                    loop_state: Some(report.state),
                    error: None,
                    elapsed_ms: elapsed_ms(started),
                }
            }
            Err(LoopFailure {
                error,
                iterations,
                state,
            }) => {
                log::error!("Interaction failed after {iterations} iteration(s): {error}");
                Interaction {
                    status: InteractionStatus::Failed,
                    answer: error.user_message().to_string(),
                    guardrail,
                    verdict: Some(verdict),
                    transcript,
                    iterations,
                    loop_state: Some(state),
                    error: Some(error.to_string()),
                    elapsed_ms: elapsed_ms(started),
                }
            }
        }
    }

    /// Answer text only.
    pub async fn ask(&self, request: &str) -> String {
        self.handle(request).await.answer
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
