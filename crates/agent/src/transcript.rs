use crate::engine::Message;
use file_agent_protocol::{ToolCall, ToolResult};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEntry {
    Request {
        text: String,
    },
    ToolCalls {
        text: Option<String>,
        calls: Vec<ToolCall>,
    },
    ToolResult {
        result: ToolResult,
    },
    FinalAnswer {
        text: String,
    },
}

/// Append-only record of one interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new(request: &str) -> Self {
        Self {
            entries: vec![TranscriptEntry::Request {
                text: request.to_string(),
            }],
        }
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResult> {
        self.entries.iter().filter_map(|entry| match entry {
            TranscriptEntry::ToolResult { result } => Some(result),
            _ => None,
        })
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.entries.iter().rev().find_map(|entry| match entry {
            TranscriptEntry::FinalAnswer { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Conversation as the reasoning engine sees it.
    pub fn to_messages(&self) -> Vec<Message> {
        self.entries
            .iter()
            .map(|entry| match entry {
                TranscriptEntry::Request { text } => Message::user(text.clone()),
                TranscriptEntry::ToolCalls { text, calls } => {
                    Message::assistant_tool_calls(text.clone(), calls.clone())
                }
                TranscriptEntry::ToolResult { result } => {
                    Message::tool(result.call_id.clone(), result.render())
                }
                TranscriptEntry::FinalAnswer { text } => Message::assistant(text.clone()),
            })
            .collect()
    }
}
