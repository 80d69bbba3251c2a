//! # File Agent Core
//!
//! Natural-language file management over one sandboxed workspace.
//!
//! ```text
//! request
//!   │
//!   ├──> Guardrail (classifier, no tools) ── OFF-TOPIC ──> refusal
//!   │
//!   └──> Orchestrator
//!          ├─> reasoner: CompletionRequest { system, transcript, catalogue }
//!          ├─> ToolCalls ──> ToolRegistry ──> Workspace (files + index)
//!          └─> Answer ──> Interaction
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use file_agent_core::{AgentConfig, FileAgent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::from_env()?;
//!     let agent = FileAgent::from_config(&config).await?;
//!     let interaction = agent.handle("List my files").await;
//!     println!("{:?}: {}", interaction.status, interaction.answer);
//!     Ok(())
//! }
//! ```

mod agent;
mod config;
pub mod engine;
mod error;
mod guardrail;
mod orchestrator;
pub mod prompts;
mod transcript;

pub use agent::{FileAgent, Interaction, InteractionStatus};
pub use config::{
    AgentConfig, ApiConfig, GuardrailConfig, ModelConfig, OrchestratorConfig, UncertainPolicy,
    ENV_EMBEDDING_MODE, ENV_MAX_ITERATIONS, ENV_ROOT,
};
pub use engine::{Completion, CompletionRequest, CompletionService, EngineError, Message, Role};
pub use error::{AgentError, ConfigError, Result};
pub use guardrail::{Guardrail, GuardrailState, Verdict, VerdictSource};
pub use orchestrator::{LoopFailure, LoopReport, LoopState, Orchestrator};
pub use transcript::{Transcript, TranscriptEntry};
