use file_agent_protocol::ToolError;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

pub const MAX_TOP_K: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListFilesArgs {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PathArgs {
    /// File path relative to the workspace root, e.g. `notes/todo.txt`
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WriteArgs {
    /// File path relative to the workspace root
    pub path: String,
    /// Full UTF-8 text to write
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchArgs {
    /// Natural-language question or keywords to look up in the workspace files
    pub query: String,
    /// Number of excerpts to return (1-10)
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Names of the closed tool set, in catalogue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ListFiles,
    ReadFile,
    CreateFile,
    UpdateFile,
    AppendFile,
    DeleteFile,
    SearchFiles,
}

impl ToolName {
    pub const ALL: [ToolName; 7] = [
        Self::ListFiles,
        Self::ReadFile,
        Self::CreateFile,
        Self::UpdateFile,
        Self::AppendFile,
        Self::DeleteFile,
        Self::SearchFiles,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListFiles => "list_files",
            Self::ReadFile => "read_file",
            Self::CreateFile => "create_file",
            Self::UpdateFile => "update_file",
            Self::AppendFile => "append_file",
            Self::DeleteFile => "delete_file",
            Self::SearchFiles => "search_files",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::ListFiles => "List every file in the workspace, one path per line.",
            Self::ReadFile => "Read the full text content of a file in the workspace.",
            Self::CreateFile => {
                "Create a new file with the given content. Fails if the file already exists."
            }
            Self::UpdateFile => "Replace the entire content of an existing file.",
            Self::AppendFile => "Append text to the end of an existing file.",
            Self::DeleteFile => "Delete a file from the workspace.",
            Self::SearchFiles => {
                "Answer questions about file contents: returns the most relevant excerpts \
                 from the workspace files for a natural-language query."
            }
        }
    }

    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::CreateFile | Self::UpdateFile | Self::AppendFile | Self::DeleteFile
        )
    }

    /// JSON Schema of the arguments object.
    pub fn parameters(self) -> Value {
        match self {
            Self::ListFiles => schema_value::<ListFilesArgs>(),
            Self::ReadFile | Self::DeleteFile => schema_value::<PathArgs>(),
            Self::CreateFile | Self::UpdateFile | Self::AppendFile => schema_value::<WriteArgs>(),
            Self::SearchFiles => schema_value::<SearchArgs>(),
        }
    }
}

fn schema_value<T: JsonSchema>() -> Value {
    let mut value = serde_json::to_value(schema_for!(T)).unwrap_or_else(|err| {
        log::error!("Failed to encode tool schema: {err}");
        serde_json::json!({ "type": "object" })
    });
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
        map.entry("properties")
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    value
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTool {
    ListFiles,
    ReadFile(PathArgs),
    CreateFile(WriteArgs),
    UpdateFile(WriteArgs),
    AppendFile(WriteArgs),
    DeleteFile(PathArgs),
    SearchFiles { query: String, top_k: usize },
}

impl FileTool {
    /// Decode and check the arguments of `name`. `default_top_k` fills an omitted `top_k`.
    pub fn parse(name: ToolName, arguments: &Value, default_top_k: usize) -> Result<Self, ToolError> {
        let tool = name.as_str();
        let arguments = match arguments {
            Value::Null => Value::Object(serde_json::Map::new()),
            Value::Object(map) if map.contains_key("_raw") => {
                return Err(ToolError::invalid_arguments(
                    tool,
                    "arguments are not a valid JSON object",
                )
                .with_hint("Send arguments as a JSON object keyed by parameter name."));
            }
            other => other.clone(),
        };

        let parsed = match name {
            ToolName::ListFiles => {
                decode::<ListFilesArgs>(tool, arguments)?;
                Self::ListFiles
            }
            ToolName::ReadFile => Self::ReadFile(checked_path(tool, decode(tool, arguments)?)?),
            ToolName::DeleteFile => {
                Self::DeleteFile(checked_path(tool, decode(tool, arguments)?)?)
            }
            ToolName::CreateFile => {
                Self::CreateFile(checked_write(tool, decode(tool, arguments)?)?)
            }
            ToolName::UpdateFile => {
                Self::UpdateFile(checked_write(tool, decode(tool, arguments)?)?)
            }
            ToolName::AppendFile => {
                Self::AppendFile(checked_write(tool, decode(tool, arguments)?)?)
            }
            ToolName::SearchFiles => {
                let args: SearchArgs = decode(tool, arguments)?;
                if args.query.trim().is_empty() {
                    return Err(ToolError::invalid_arguments(tool, "query must not be empty"));
                }
                let top_k = args.top_k.unwrap_or(default_top_k);
                if !(1..=MAX_TOP_K).contains(&top_k) {
                    return Err(ToolError::invalid_arguments(
                        tool,
                        format!("top_k must be between 1 and {MAX_TOP_K}, got {top_k}"),
                    ));
                }
                Self::SearchFiles {
                    query: args.query,
                    top_k,
                }
            }
        };
        Ok(parsed)
    }

    pub fn name(&self) -> ToolName {
        match self {
            Self::ListFiles => ToolName::ListFiles,
            Self::ReadFile(_) => ToolName::ReadFile,
            Self::CreateFile(_) => ToolName::CreateFile,
            Self::UpdateFile(_) => ToolName::UpdateFile,
            Self::AppendFile(_) => ToolName::AppendFile,
            Self::DeleteFile(_) => ToolName::DeleteFile,
            Self::SearchFiles { .. } => ToolName::SearchFiles,
        }
    }
}

fn decode<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|err| ToolError::invalid_arguments(tool, err))
}

fn checked_path(tool: &str, args: PathArgs) -> Result<PathArgs, ToolError> {
    if args.path.trim().is_empty() {
        return Err(ToolError::invalid_arguments(tool, "path must not be empty"));
    }
    Ok(args)
}

fn checked_write(tool: &str, args: WriteArgs) -> Result<WriteArgs, ToolError> {
    if args.path.trim().is_empty() {
        return Err(ToolError::invalid_arguments(tool, "path must not be empty"));
    }
    Ok(args)
}
