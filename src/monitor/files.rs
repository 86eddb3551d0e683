//! Conversation file identity and per-file processing.

use std::path::Path;
use std::sync::Arc;

use crate::config::MonitorConfig;
use crate::telemetry::TelemetrySink;
use crate::watcher::parse_content;

use super::processor::{FileContext, MessageProcessor, ProcessorStats};
use super::session::SessionResolver;

/// Path segment under the root that anchors project directories.
pub const PROJECTS_ANCHOR: &str = "projects";

/// Character standing in for the path separator in project directory names.
const ENCODING_CHAR: char = '-';

/// Decode an encoded project segment into a path string.
///
/// Lossy: a project path that itself contains `-` decodes incorrectly.
/// Accepted limitation of the on-disk layout.
#[must_use]
pub fn decode_project_segment(segment: &str) -> String {
    segment.replace(ENCODING_CHAR, "/")
}

/// Derive (project path, conversation id) from a conversation file path.
///
/// Returns `None` when the anchor segment is absent or not enough segments
/// follow it.
#[must_use]
pub fn conversation_identity(path: &Path) -> Option<(String, String)> {
    let mut components = path.components().map(|c| c.as_os_str().to_string_lossy());
    components.by_ref().find(|c| c.as_ref() == PROJECTS_ANCHOR)?;
    let encoded = components.next()?;
    components.next()?;
    let conversation_id = path.file_stem()?.to_string_lossy().into_owned();
    Some((decode_project_segment(&encoded), conversation_id))
}

/// Orchestrates per-file processing: identity, session, parse, dispatch.
pub struct FileProcessor {
    sessions: SessionResolver,
    processor: MessageProcessor,
}

impl FileProcessor {
    #[must_use]
    pub fn new(sink: Arc<dyn TelemetrySink>, config: &MonitorConfig) -> Self {
        Self {
            sessions: SessionResolver::new(),
            processor: MessageProcessor::new(sink, config),
        }
    }

    /// Process one conversation file end to end.
    ///
    /// Files outside the expected layout are skipped silently. Read errors
    /// abort only this invocation; a later change event retries the file.
    pub async fn process_path(&mut self, path: &Path) {
        let Some((project_path, conversation_id)) = conversation_identity(path) else {
            tracing::debug!(path = %path.display(), "Path outside expected layout, skipping");
            return;
        };

        let session_id = self
            .sessions
            .resolve(path, &project_path, &conversation_id);

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read conversation file"
                );
                return;
            }
        };

        let ctx = FileContext {
            session_id,
            project_path,
            conversation_id,
        };
        for entry in parse_content(&content) {
            self.processor.handle(&entry, &ctx).await;
        }
    }

    #[must_use]
    pub fn stats(&self) -> ProcessorStats {
        self.processor.stats()
    }
}
