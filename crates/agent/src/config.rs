use crate::error::ConfigError;
use file_agent_text_chunker::ChunkerConfig;
use file_agent_tools::MAX_TOP_K;
use file_agent_vector_store::{EmbeddingConfig, EmbeddingMode};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_ROOT: &str = "FILE_AGENT_ROOT";
pub const ENV_EMBEDDING_MODE: &str = "FILE_AGENT_EMBEDDING_MODE";
pub const ENV_MAX_ITERATIONS: &str = "FILE_AGENT_MAX_ITERATIONS";

/// Everything needed to build a [`crate::FileAgent`].
///
/// Loaded from a JSON or TOML file; every field has a default so a partial file (or no
/// file) is valid. Environment overrides are applied on top, and command-line flags on
/// top of those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub workspace_root: PathBuf,
    /// Keep the index snapshot under `<root>/.file-agent/`.
    pub persist_index: bool,
    pub chunker: ChunkerConfig,
    pub embedding: EmbeddingConfig,
    pub api: ApiConfig,
    #[serde(deserialize_with = "classifier_section")]
    pub classifier: ModelConfig,
    #[serde(deserialize_with = "reasoner_section")]
    pub reasoner: ModelConfig,
    pub guardrail: GuardrailConfig,
    pub orchestrator: OrchestratorConfig,
    /// Excerpts returned by `search_files` when the call omits `top_k`.
    pub top_k: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("workspace"),
            persist_index: true,
            chunker: ChunkerConfig::default(),
            embedding: EmbeddingConfig::default(),
            api: ApiConfig::default(),
            classifier: ModelConfig::classifier(),
            reasoner: ModelConfig::reasoner(),
            guardrail: GuardrailConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Environment variable holding the API key. Keys are never read from the file.
    pub api_key_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// One chat model. A config section may set any subset of the fields; the rest
/// come from the role's defaults ([`ModelConfig::classifier`] or [`ModelConfig::reasoner`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    /// Per-call timeout.
    pub timeout_ms: u64,
}

impl ModelConfig {
    pub fn classifier() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            timeout_ms: 20_000,
        }
    }

    pub fn reasoner() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            timeout_ms: 60_000,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ModelSection {
    model: Option<String>,
    temperature: Option<f32>,
    timeout_ms: Option<u64>,
}

impl ModelSection {
    fn over(self, base: ModelConfig) -> ModelConfig {
        ModelConfig {
            model: self.model.unwrap_or(base.model),
            temperature: self.temperature.unwrap_or(base.temperature),
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
        }
    }
}

fn classifier_section<'de, D>(deserializer: D) -> Result<ModelConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ModelSection::deserialize(deserializer)?.over(ModelConfig::classifier()))
}

fn reasoner_section<'de, D>(deserializer: D) -> Result<ModelConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ModelSection::deserialize(deserializer)?.over(ModelConfig::reasoner()))
}

/// What to do when the classifier answers neither `ON-TOPIC` nor `OFF-TOPIC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UncertainPolicy {
    #[default]
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    pub uncertain_default: UncertainPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Reasoning calls allowed per interaction.
    pub max_iterations: usize,
    pub tool_timeout_ms: u64,
    /// Wall-clock budget for the whole loop.
    pub interaction_timeout_ms: u64,
    /// Run the calls of one turn concurrently.
    pub parallel_tool_calls: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_timeout_ms: 30_000,
            interaction_timeout_ms: 300_000,
            parallel_tool_calls: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    pub fn interaction_timeout(&self) -> Duration {
        Duration::from_millis(self.interaction_timeout_ms)
    }
}

impl AgentConfig {
    /// Read `path`, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_slice(&bytes)?;
        config.apply_env_overrides()?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a config file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON, falling back to TOML.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let value: serde_json::Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(json_err) => {
                let utf8 = std::str::from_utf8(bytes)
                    .map_err(|err| ConfigError::Parse(format!("{json_err}; {err}")))?;
                let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                    ConfigError::Parse(format!("{json_err}; TOML parse error: {toml_err}"))
                })?;
                serde_json::to_value(toml_value).map_err(|err| {
                    ConfigError::Parse(format!("Failed to convert TOML config to JSON: {err}"))
                })?
            }
        };
        serde_json::from_value(value).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable source.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let lookup = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        if let Some(root) = lookup(ENV_ROOT) {
            self.workspace_root = PathBuf::from(root);
        }
        if let Some(raw) = lookup(ENV_EMBEDDING_MODE) {
            self.embedding.mode = EmbeddingMode::parse(&raw).map_err(|_| ConfigError::Env {
                var: ENV_EMBEDDING_MODE,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_MAX_ITERATIONS) {
            self.orchestrator.max_iterations =
                raw.trim().parse().map_err(|_| ConfigError::Env {
                    var: ENV_MAX_ITERATIONS,
                    value: raw.clone(),
                })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunker
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if self.orchestrator.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "orchestrator.max_iterations must be greater than zero".into(),
            ));
        }
        if !(1..=MAX_TOP_K).contains(&self.top_k) {
            return Err(ConfigError::Invalid(format!(
                "top_k must be between 1 and {MAX_TOP_K}"
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Invalid(
                "embedding.dimension must be greater than zero".into(),
            ));
        }
        let timeouts = [
            ("classifier.timeout_ms", self.classifier.timeout_ms),
            ("reasoner.timeout_ms", self.reasoner.timeout_ms),
            ("orchestrator.tool_timeout_ms", self.orchestrator.tool_timeout_ms),
            (
                "orchestrator.interaction_timeout_ms",
                self.orchestrator.interaction_timeout_ms,
            ),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
        }
        Ok(())
    }
}
