//! Typed tool registry for the file agent.
//!
//! The reasoning engine sees a closed catalogue of seven tools. Every call is resolved by
//! name, its arguments are decoded into a typed struct (`deny_unknown_fields`) and checked
//! before the workspace is touched, and every outcome is returned as a
//! [`file_agent_protocol::ToolResult`].

mod args;
mod registry;

pub use args::{
    FileTool, ListFilesArgs, PathArgs, SearchArgs, ToolName, WriteArgs, MAX_TOP_K,
};
pub use registry::{
    render_excerpts, tool_error, Footprint, ToolRegistry, EMPTY_WORKSPACE, NO_RESULTS,
};
