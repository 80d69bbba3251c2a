//! Pre-flight scope check.
//!
//! One tool-less completion call decides whether a request is about file management.
//! The verdict is final for the interaction: a rejected request never reaches the
//! reasoner or any tool.

use crate::config::{GuardrailConfig, UncertainPolicy};
use crate::engine::{Completion, CompletionRequest, CompletionService, Message};
use crate::error::{AgentError, Result};
use crate::prompts::CLASSIFIER_PROMPT;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailState {
    Init,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    Classifier,
    UncertainDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub in_scope: bool,
    pub rationale: String,
    pub source: VerdictSource,
}

impl Verdict {
    /// Interpret a classifier reply.
    pub fn from_reply(reply: &str, uncertain: UncertainPolicy) -> Self {
        let label = reply
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '`')
            .to_ascii_uppercase();
        match label.as_str() {
            "ON-TOPIC" => Self {
                in_scope: true,
                rationale: "classified ON-TOPIC".to_string(),
                source: VerdictSource::Classifier,
            },
            "OFF-TOPIC" => Self {
                in_scope: false,
                rationale: "classified OFF-TOPIC".to_string(),
                source: VerdictSource::Classifier,
            },
            _ => Self {
                in_scope: uncertain == UncertainPolicy::Accept,
                rationale: format!("unrecognized classifier reply '{}'", reply.trim()),
                source: VerdictSource::UncertainDefault,
            },
        }
    }

    pub fn state(&self) -> GuardrailState {
        if self.in_scope {
            GuardrailState::Accepted
        } else {
            GuardrailState::Rejected
        }
    }
}

pub struct Guardrail {
    service: Arc<dyn CompletionService>,
    config: GuardrailConfig,
    temperature: f32,
    timeout: Duration,
}

impl Guardrail {
    pub fn new(
        service: Arc<dyn CompletionService>,
        config: GuardrailConfig,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            config,
            temperature,
            timeout,
        }
    }

    /// Classify `request`. Service failures and timeouts are errors, never verdicts.
    pub async fn classify(&self, request: &str) -> Result<Verdict> {
        let call = self.service.complete(CompletionRequest {
            system: CLASSIFIER_PROMPT.to_string(),
            messages: vec![Message::user(request)],
            tools: Vec::new(),
            temperature: self.temperature,
        });
        let completion = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                AgentError::ClassificationService(format!(
                    "{} did not answer within {}ms",
                    self.service.model(),
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|err| AgentError::ClassificationService(err.to_string()))?;

        let reply = match completion {
            Completion::Answer(text) => text,
            Completion::ToolCalls { text, .. } => text.unwrap_or_default(),
        };
        let verdict = Verdict::from_reply(&reply, self.config.uncertain_default);
        log::info!(
            "Topic classification ({}): {:?} via {:?}",
            self.service.model(),
            verdict.state(),
            verdict.source
        );
        Ok(verdict)
    }
}
