//! Tool-dispatching loop driven by the reasoning engine.
//!
//! ```text
//! Running ──Answer──────────────> Done
//!    │
//!    └─ToolCalls─> AwaitingToolResults ──results appended──> Running
//!
//! cancellation / budget / reasoning failure ───────────────> Failed
//! ```

use crate::config::OrchestratorConfig;
use crate::engine::{Completion, CompletionRequest, CompletionService};
use crate::error::AgentError;
use crate::prompts::SYSTEM_PROMPT;
use crate::transcript::{Transcript, TranscriptEntry};
use file_agent_protocol::{codes, ToolCall, ToolError, ToolResult};
use file_agent_tools::{Footprint, ToolRegistry};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Running,
    AwaitingToolResults,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopReport {
    pub answer: String,
    pub iterations: usize,
    /// Always [`LoopState::Done`].
    pub state: LoopState,
}

#[derive(Debug)]
pub struct LoopFailure {
    pub error: AgentError,
    pub iterations: usize,
    /// Always [`LoopState::Failed`].
    pub state: LoopState,
}

pub struct Orchestrator {
    reasoner: Arc<dyn CompletionService>,
    tools: ToolRegistry,
    config: OrchestratorConfig,
    temperature: f32,
    reasoning_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        reasoner: Arc<dyn CompletionService>,
        tools: ToolRegistry,
        config: OrchestratorConfig,
        temperature: f32,
        reasoning_timeout: Duration,
    ) -> Self {
        Self {
            reasoner,
            tools,
            config,
            temperature,
            reasoning_timeout,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Drive the loop until the engine answers or a budget is exhausted.
    ///
    /// `transcript` must already hold the request. Cancellation is observed between
    /// iterations; a call in flight is allowed to finish.
    pub async fn run(
        &self,
        transcript: &mut Transcript,
        cancel: &CancellationToken,
    ) -> Result<LoopReport, LoopFailure> {
        let deadline = Instant::now() + self.config.interaction_timeout();
        let catalogue = self.tools.catalogue();
        let mut seen_ids = HashSet::new();
        let mut state = LoopState::Running;

        for iteration in 1..=self.config.max_iterations {
            let completed = iteration - 1;
            if cancel.is_cancelled() {
                log::info!("Interaction cancelled before iteration {iteration}");
                return Err(fail(&mut state, AgentError::Cancelled, completed));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                let error = AgentError::LoopBudgetExceeded { iterations: completed };
                return Err(fail(&mut state, error, completed));
            }

            log::debug!("Iteration {iteration}: asking {}", self.reasoner.model());
            let request = CompletionRequest {
                system: SYSTEM_PROMPT.to_string(),
                messages: transcript.to_messages(),
                tools: catalogue.clone(),
                temperature: self.temperature,
            };
            let budget_bound = remaining < self.reasoning_timeout;
            let completion = match tokio::time::timeout(
                remaining.min(self.reasoning_timeout),
                self.reasoner.complete(request),
            )
            .await
            {
                Ok(Ok(completion)) => completion,
                Ok(Err(err)) => {
                    log::warn!("Reasoning call failed: {err}");
                    let error = AgentError::Reasoning(err.to_string());
                    return Err(fail(&mut state, error, completed));
                }
                Err(_) if budget_bound => {
                    let error = AgentError::LoopBudgetExceeded { iterations: completed };
                    return Err(fail(&mut state, error, completed));
                }
                Err(_) => {
                    log::warn!(
                        "Reasoning call timed out after {}ms",
                        self.reasoning_timeout.as_millis()
                    );
                    let error = AgentError::Reasoning(format!(
                        "{} did not answer within {}ms",
                        self.reasoner.model(),
                        self.reasoning_timeout.as_millis()
                    ));
                    return Err(fail(&mut state, error, completed));
                }
            };

            let (text, calls) = match completion {
                Completion::ToolCalls { text, calls } if !calls.is_empty() => (text, calls),
                Completion::ToolCalls { text, .. } => {
                    let answer = text.unwrap_or_default();
                    return Ok(finish(transcript, &mut state, answer, iteration));
                }
                Completion::Answer(answer) => {
                    return Ok(finish(transcript, &mut state, answer, iteration));
                }
            };

            let calls = assign_call_ids(calls, iteration, &mut seen_ids);
            log::info!(
                "Iteration {iteration}: {} tool call(s): {}",
                calls.len(),
                calls
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            transcript.push(TranscriptEntry::ToolCalls {
                text,
                calls: calls.clone(),
            });

            transition(&mut state, LoopState::AwaitingToolResults);
            let results = self.execute_calls(&calls).await;
            for result in results {
                transcript.push(TranscriptEntry::ToolResult { result });
            }
            transition(&mut state, LoopState::Running);
        }

        log::warn!(
            "Stopping after {} iterations without a final answer",
            self.config.max_iterations
        );
        let iterations = self.config.max_iterations;
        Err(fail(
            &mut state,
            AgentError::LoopBudgetExceeded { iterations },
            iterations,
        ))
    }

    /// Split a turn into waves of calls that may overlap; waves run one after another.
    /// A call joins the current wave unless it conflicts with a call already in it.
    fn plan_waves<'a>(&self, calls: &'a [ToolCall]) -> Vec<Vec<&'a ToolCall>> {
        let mut waves = Vec::new();
        let mut current: Vec<(Footprint, &ToolCall)> = Vec::new();
        for call in calls {
            let footprint = self.tools.footprint(call);
            if current
                .iter()
                .any(|(other, _)| other.conflicts_with(&footprint))
            {
                waves.push(std::mem::take(&mut current));
            }
            current.push((footprint, call));
        }
        if !current.is_empty() {
            waves.push(current);
        }
        waves
            .into_iter()
            .map(|wave| wave.into_iter().map(|(_, call)| call).collect())
            .collect()
    }

    /// Results come back in call order whatever order the calls finish in.
    async fn execute_calls(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        let timeout = self.config.tool_timeout();
        if !self.config.parallel_tool_calls || calls.len() < 2 {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(execute_one(self.tools.clone(), call.clone(), timeout).await);
            }
            return results;
        }

        let waves = self.plan_waves(calls);
        if waves.len() > 1 {
            log::debug!(
                "Running {} tool calls in {} ordered waves",
                calls.len(),
                waves.len()
            );
        }
        let mut by_id: HashMap<String, ToolResult> = HashMap::with_capacity(calls.len());
        for wave in waves {
            let mut set = JoinSet::new();
            for call in wave {
                set.spawn(execute_one(self.tools.clone(), call.clone(), timeout));
            }
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(result) => {
                        by_id.insert(result.call_id.clone(), result);
                    }
                    Err(err) => log::error!("Tool task failed to join: {err}"),
                }
            }
        }

        calls
            .iter()
            .map(|call| {
                by_id.remove(&call.id).unwrap_or_else(|| {
                    ToolResult::error(
                        call,
                        ToolError::new(codes::INTERNAL, "Tool task ended without a result"),
                    )
                })
            })
            .collect()
    }
}

fn transition(state: &mut LoopState, next: LoopState) {
    log::trace!("Loop state {:?} -> {next:?}", *state);
    *state = next;
}

fn finish(
    transcript: &mut Transcript,
    state: &mut LoopState,
    answer: String,
    iteration: usize,
) -> LoopReport {
    transcript.push(TranscriptEntry::FinalAnswer {
        text: answer.clone(),
    });
    transition(state, LoopState::Done);
    LoopReport {
        answer,
        iterations: iteration,
        state: *state,
    }
}

fn fail(state: &mut LoopState, error: AgentError, iterations: usize) -> LoopFailure {
    transition(state, LoopState::Failed);
    LoopFailure {
        error,
        iterations,
        state: *state,
    }
}

/// Run one call in its own task. On timeout the task is detached and finishes on its own,
/// so a write is never interrupted half-way.
async fn execute_one(tools: ToolRegistry, call: ToolCall, timeout: Duration) -> ToolResult {
    let task = {
        let call = call.clone();
        tokio::spawn(async move { tools.execute(&call).await })
    };
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => ToolResult::error(
            &call,
            ToolError::new(codes::INTERNAL, format!("Tool task failed: {err}")),
        ),
        Err(_) => {
            log::warn!(
                "Tool {} ({}) timed out after {}ms",
                call.name,
                call.id,
                timeout.as_millis()
            );
            ToolResult::error(&call, ToolError::timeout(&call.name, timeout.as_millis() as u64))
        }
    }
}

/// Give every call a unique, non-empty id so results can be matched back unambiguously.
fn assign_call_ids(
    calls: Vec<ToolCall>,
    iteration: usize,
    seen: &mut HashSet<String>,
) -> Vec<ToolCall> {
    calls
        .into_iter()
        .enumerate()
        .map(|(index, mut call)| {
            if call.id.trim().is_empty() || seen.contains(&call.id) {
                let mut candidate = format!("call_{iteration}_{index}");
                let mut suffix = 0;
                while seen.contains(&candidate) {
                    suffix += 1;
                    candidate = format!("call_{iteration}_{index}_{suffix}");
                }
                log::debug!("Replacing tool call id '{}' with '{candidate}'", call.id);
                call.id = candidate;
            }
            seen.insert(call.id.clone());
            call
        })
        .collect()
}
