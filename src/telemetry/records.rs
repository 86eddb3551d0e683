//! Outbound telemetry record types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Name attached to every user trace.
pub const TRACE_NAME: &str = "claude_code_user";

/// Name attached to every assistant generation.
pub const GENERATION_NAME: &str = "claude_response";

/// Top-level record for one user message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    pub id: String,
    pub name: &'static str,
    pub session_id: String,
    pub user_id: String,
    pub input: String,
    pub metadata: TraceMetadata,
    pub timestamp: DateTime<Utc>,
}

/// Metadata attached to a trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceMetadata {
    pub project: String,
    pub conversation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

/// Record for one model response, linked to its parent trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub output: String,
    pub metadata: GenerationMetadata,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Metadata attached to a generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub project: String,
    pub conversation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}
