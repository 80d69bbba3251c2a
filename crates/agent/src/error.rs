use file_agent_indexer::WorkspaceError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

/// Failures that end an interaction or prevent the agent from starting.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The guardrail could not obtain a verdict. Never treated as accept or reject.
    #[error("Classification service failed: {0}")]
    ClassificationService(String),

    #[error("Reasoning service failed: {0}")]
    Reasoning(String),

    #[error("Loop budget exceeded after {iterations} iterations")]
    LoopBudgetExceeded { iterations: usize },

    #[error("Interaction cancelled")]
    Cancelled,

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Completion client error: {0}")]
    Engine(#[from] crate::engine::EngineError),
}

impl AgentError {
    /// Text shown to the person who made the request.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ClassificationService(_) => {
                "I could not check your request right now. Please try again later."
            }
            Self::Reasoning(_) => {
                "I could not complete the request because the reasoning service failed."
            }
            Self::LoopBudgetExceeded { .. } => crate::prompts::BUDGET_EXCEEDED,
            Self::Cancelled => "The request was cancelled.",
            Self::Workspace(_) | Self::Config(_) | Self::Engine(_) => {
                "The file agent is not available right now."
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config is not valid JSON or TOML: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for {var}")]
    Env { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
