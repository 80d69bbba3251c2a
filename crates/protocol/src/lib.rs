//! Wire types exchanged between the reasoning engine, the orchestration loop and the
//! tool registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A tool invocation requested by the reasoning engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier assigned by the engine; results are matched back by this id.
    pub id: String,
    pub name: String,
    /// JSON object keyed by declared parameter names.
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Structured tool failure handed back to the reasoning engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ToolError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            hint: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn unknown_tool(name: &str, known: &[&str]) -> Self {
        Self::new(codes::UNKNOWN_TOOL, format!("Unknown tool '{name}'"))
            .with_hint(format!("Available tools: {}", known.join(", ")))
    }

    pub fn invalid_arguments(tool: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            codes::INVALID_ARGUMENTS,
            format!("Invalid arguments for '{tool}': {detail}"),
        )
    }

    pub fn timeout(tool: &str, timeout_ms: u64) -> Self {
        Self::new(
            codes::TOOL_TIMEOUT,
            format!("Tool '{tool}' did not finish within {timeout_ms}ms"),
        )
        .with_hint("The operation may still complete; list or read the file before retrying.")
    }
}

/// Stable error codes carried in [`ToolError::code`].
pub mod codes {
    pub const UNKNOWN_TOOL: &str = "unknown_tool";
    pub const INVALID_ARGUMENTS: &str = "invalid_arguments";
    pub const TOOL_TIMEOUT: &str = "tool_timeout";
    pub const PATH_ESCAPE: &str = "path_escape";
    pub const RESERVED_PATH: &str = "reserved_path";
    pub const INVALID_PATH: &str = "invalid_path";
    pub const NOT_FOUND: &str = "not_found";
    pub const ALREADY_EXISTS: &str = "already_exists";
    pub const NOT_A_FILE: &str = "not_a_file";
    pub const INVALID_UTF8: &str = "invalid_utf8";
    pub const EMBEDDING_FAILED: &str = "embedding_failed";
    pub const IO_ERROR: &str = "io_error";
    pub const INTERNAL: &str = "internal";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Ok { output: String },
    Error { error: ToolError },
}

/// Result of one tool call. Immutable once appended to a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub tool_name: String,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn ok(call: &ToolCall, output: impl Into<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            outcome: ToolOutcome::Ok {
                output: output.into(),
            },
        }
    }

    pub fn error(call: &ToolCall, error: ToolError) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            outcome: ToolOutcome::Error { error },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Ok { .. })
    }

    pub fn error_code(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Ok { .. } => None,
            ToolOutcome::Error { error } => Some(error.code.as_str()),
        }
    }

    /// Text sent back to the reasoning engine for this result.
    pub fn render(&self) -> String {
        match &self.outcome {
            ToolOutcome::Ok { output } => output.clone(),
            ToolOutcome::Error { error } => {
                serde_json::to_string(&serde_json::json!({ "error": error }))
                    .unwrap_or_else(|_| format!("error: {error}"))
            }
        }
    }
}

/// Advertised shape of one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

impl ToolSchema {
    /// Declared parameter names, in schema order.
    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }
}
