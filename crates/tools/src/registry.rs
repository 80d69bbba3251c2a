use crate::args::{FileTool, ToolName};
use file_agent_file_store::StoreError;
use file_agent_indexer::{Workspace, WorkspaceError};
use file_agent_protocol::{codes, ToolCall, ToolError, ToolResult, ToolSchema};
use file_agent_vector_store::SearchHit;
use std::sync::Arc;

pub const EMPTY_WORKSPACE: &str = "The workspace is empty.";
pub const NO_RESULTS: &str = "No relevant information found in the documents.";

/// What one call touches. Calls of a turn whose footprints conflict must run in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Footprint {
    /// The call is rejected before it reaches the workspace.
    Nothing,
    /// One file, keyed by its sandbox-relative path.
    Path { key: String, write: bool },
    /// The listing or the whole index.
    Workspace,
}

impl Footprint {
    pub fn conflicts_with(&self, other: &Footprint) -> bool {
        match (self, other) {
            (Self::Nothing, _) | (_, Self::Nothing) => false,
            (Self::Workspace, Self::Workspace) => false,
            (Self::Workspace, Self::Path { write, .. })
            | (Self::Path { write, .. }, Self::Workspace) => *write,
            (
                Self::Path { key, write },
                Self::Path {
                    key: other_key,
                    write: other_write,
                },
            ) => key == other_key && (*write || *other_write),
        }
    }
}

/// Executes the closed set of file tools against one [`Workspace`].
///
/// `execute` never fails: unknown names, bad arguments and store or index errors all come
/// back as error [`ToolResult`]s the reasoning engine can act on.
#[derive(Clone)]
pub struct ToolRegistry {
    workspace: Workspace,
    default_top_k: usize,
    catalogue: Arc<Vec<ToolSchema>>,
}

impl ToolRegistry {
    pub fn new(workspace: Workspace, default_top_k: usize) -> Self {
        let catalogue = ToolName::ALL
            .into_iter()
            .map(|tool| ToolSchema {
                name: tool.as_str().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect();
        Self {
            workspace,
            default_top_k,
            catalogue: Arc::new(catalogue),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn catalogue(&self) -> Vec<ToolSchema> {
        self.catalogue.as_ref().clone()
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        ToolName::ALL.into_iter().map(ToolName::as_str).collect()
    }

    /// Resolve the tool name and validate the arguments without touching the workspace.
    pub fn parse(&self, call: &ToolCall) -> Result<FileTool, ToolError> {
        let name = ToolName::from_name(&call.name)
            .ok_or_else(|| ToolError::unknown_tool(&call.name, &self.tool_names()))?;
        FileTool::parse(name, &call.arguments, self.default_top_k)
    }

    pub fn footprint(&self, call: &ToolCall) -> Footprint {
        let Ok(tool) = self.parse(call) else {
            return Footprint::Nothing;
        };
        let write = tool.name().is_mutation();
        let path = match tool {
            FileTool::ListFiles | FileTool::SearchFiles { .. } => return Footprint::Workspace,
            FileTool::ReadFile(args) | FileTool::DeleteFile(args) => args.path,
            FileTool::CreateFile(args) | FileTool::UpdateFile(args) | FileTool::AppendFile(args) => {
                args.path
            }
        };
        match self.workspace.files().resolve(&path) {
            Ok(resolved) => Footprint::Path {
                key: resolved.relative,
                write,
            },
            Err(_) => Footprint::Nothing,
        }
    }

    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let tool = match self.parse(call) {
            Ok(tool) => tool,
            Err(err) => {
                log::warn!("Rejected tool call {} ({}): {err}", call.id, call.name);
                return ToolResult::error(call, err);
            }
        };

        let name = tool.name();
        match self.run(tool).await {
            Ok(output) => {
                if name.is_mutation() {
                    log::info!("Tool {} succeeded ({})", name.as_str(), call.id);
                } else {
                    log::debug!("Tool {} succeeded ({})", name.as_str(), call.id);
                }
                ToolResult::ok(call, output)
            }
            Err(err) => {
                log::warn!("Tool {} failed ({}): {err}", name.as_str(), call.id);
                ToolResult::error(call, tool_error(&err))
            }
        }
    }

    async fn run(&self, tool: FileTool) -> Result<String, WorkspaceError> {
        match tool {
            FileTool::ListFiles => {
                let files = self.workspace.list_files()?;
                if files.is_empty() {
                    Ok(EMPTY_WORKSPACE.to_string())
                } else {
                    Ok(files.join("\n"))
                }
            }
            FileTool::ReadFile(args) => self.workspace.read_file(&args.path).await,
            FileTool::CreateFile(args) => {
                let path = self.workspace.create_file(&args.path, &args.content).await?;
                Ok(format!(
                    "Created '{path}' with {} characters and updated the index.",
                    args.content.chars().count()
                ))
            }
            FileTool::UpdateFile(args) => {
                let path = self.workspace.update_file(&args.path, &args.content).await?;
                Ok(format!(
                    "Wrote {} characters to '{path}' and updated the index.",
                    args.content.chars().count()
                ))
            }
            FileTool::AppendFile(args) => {
                let path = self.workspace.append_file(&args.path, &args.content).await?;
                Ok(format!(
                    "Appended {} characters to '{path}' and updated the index.",
                    args.content.chars().count()
                ))
            }
            FileTool::DeleteFile(args) => {
                let path = self.workspace.delete_file(&args.path).await?;
                Ok(format!("Deleted '{path}' and removed it from the index."))
            }
            FileTool::SearchFiles { query, top_k } => {
                let hits = self.workspace.search(&query, top_k).await?;
                Ok(render_excerpts(&hits))
            }
        }
    }
}

pub fn render_excerpts(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_RESULTS.to_string();
    }
    hits.iter()
        .map(|hit| {
            format!(
                "--- Excerpt from: {} (chunk {}, score {:.3}) ---\n{}\n",
                hit.path, hit.chunk_index, hit.score, hit.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map a workspace failure to the stable code the reasoning engine sees.
pub fn tool_error(err: &WorkspaceError) -> ToolError {
    let message = err.to_string();
    match err {
        WorkspaceError::Store(store) => match store {
            StoreError::PathEscape { .. } => ToolError::new(codes::PATH_ESCAPE, message)
                .with_hint("Use a path relative to the workspace root."),
            StoreError::ReservedPath { .. } => ToolError::new(codes::RESERVED_PATH, message),
            StoreError::InvalidPath { .. } => ToolError::new(codes::INVALID_PATH, message),
            StoreError::NotFound { .. } => ToolError::new(codes::NOT_FOUND, message)
                .with_hint("Call list_files to see which files exist."),
            StoreError::AlreadyExists { .. } => ToolError::new(codes::ALREADY_EXISTS, message)
                .with_hint("Use update_file or append_file to change an existing file."),
            StoreError::NotAFile { .. } => ToolError::new(codes::NOT_A_FILE, message),
            StoreError::InvalidUtf8 { .. } => ToolError::new(codes::INVALID_UTF8, message),
            StoreError::Io { .. } => ToolError::new(codes::IO_ERROR, message),
        },
        err if err.is_embedding() => ToolError::new(codes::EMBEDDING_FAILED, message)
            .with_hint("Nothing was written; the file and the index are unchanged."),
        WorkspaceError::Index(_) | WorkspaceError::Chunker(_) | WorkspaceError::Task(_) => {
            ToolError::new(codes::INTERNAL, message)
        }
    }
}
