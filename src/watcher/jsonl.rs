//! JSONL parser for Claude Code conversation files.
//!
//! One line is one [`LogEntry`]. Only user and assistant entries carry
//! message semantics; every other kind deserializes to [`LogEntry::Other`]
//! and is ignored upstream.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::display::{flatten, format_tool_input, truncate};

/// A single entry in a conversation file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogEntry {
    /// Human message or tool result echo.
    User(MessageEntry),
    /// Model response.
    Assistant(MessageEntry),
    /// Any other entry kind (summary, system, snapshot, ...).
    #[serde(other)]
    Other,
}

/// Shared shape of user and assistant entries.
///
/// Everything beyond the tag is optional: real files omit fields freely,
/// and a missing id is the processor's concern, not the parser's.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEntry {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<MessagePayload>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

/// Message payload: plain string, structured object, or anything else.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessagePayload {
    /// Plain text payload.
    Text(String),
    /// Structured payload with a text field and/or content blocks.
    Structured(StructuredMessage),
    /// Unrecognized shape; yields empty text.
    Other(serde_json::Value),
}

/// Structured message payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructuredMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Content of a structured message - plain text or blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content.
    Text(String),
    /// Structured content blocks.
    Blocks(Vec<ContentBlock>),
}

/// A content block within a structured message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content.
    Text { text: String },
    /// Tool invocation request.
    ToolUse {
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    /// Tool result.
    ToolResult {
        #[serde(default)]
        content: serde_json::Value,
    },
    /// Thinking block.
    Thinking { thinking: String },
    /// Unknown block type.
    #[serde(other)]
    Unknown,
}

impl MessageEntry {
    /// Extract the text body used for display and forwarding.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.message {
            Some(MessagePayload::Text(s)) => s.clone(),
            Some(MessagePayload::Structured(m)) => m.text(),
            Some(MessagePayload::Other(_)) | None => String::new(),
        }
    }

    /// Model name, when the payload carries one.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        match &self.message {
            Some(MessagePayload::Structured(m)) => m.model.as_deref(),
            _ => None,
        }
    }
}

impl StructuredMessage {
    fn text(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        match &self.content {
            Some(MessageContent::Text(s)) => s.clone(),
            Some(MessageContent::Blocks(blocks)) => render_blocks(blocks),
            None => String::new(),
        }
    }
}

/// Render content blocks into one text body. Tool invocations and results
/// are summarized inline rather than dropped - they carry the operational
/// meaning of the turn.
fn render_blocks(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.clone()),
            ContentBlock::ToolUse { name, input } => {
                Some(format!("[tool] {name}({})", format_tool_input(input)))
            }
            ContentBlock::ToolResult { content } => {
                Some(format!("[result] {}", tool_result_excerpt(content)))
            }
            ContentBlock::Thinking { .. } | ContentBlock::Unknown => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tool_result_excerpt(content: &serde_json::Value) -> String {
    let raw = match content {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate(&flatten(&raw), 80)
}

/// Parse JSONL content into entries.
///
/// Skips malformed lines with a warning; a bad line never aborts the rest
/// of the file.
#[must_use]
pub fn parse_content(content: &str) -> Vec<LogEntry> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<LogEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed JSONL line");
                None
            }
        })
        .collect()
}
