//! Message classification, deduplication, and record emission.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;

use crate::config::MonitorConfig;
use crate::display;
use crate::telemetry::{
    GenerationMetadata, GenerationRecord, TelemetrySink, TraceMetadata, TraceRecord,
    GENERATION_NAME, TRACE_NAME,
};
use crate::watcher::{LogEntry, MessageEntry};

/// Ids remembered before the oldest are evicted.
const PROCESSED_CAPACITY: usize = 250_000;

/// Identity of the file a message came from.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub session_id: String,
    pub project_path: String,
    pub conversation_id: String,
}

/// Run-lifetime set of forwarded entry ids with oldest-first eviction.
#[derive(Debug)]
pub struct ProcessedSet {
    ids: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ProcessedSet {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// Record an id. Returns false when it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        true
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Counters kept across the run, reported at shutdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessorStats {
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub processed: usize,
}

#[derive(Debug, Clone, Copy)]
enum Role {
    User,
    Assistant,
}

/// Processes parsed entries: classify, deduplicate, echo, forward, flush.
pub struct MessageProcessor {
    sink: Arc<dyn TelemetrySink>,
    seen: ProcessedSet,
    processed_total: usize,
    user_messages: usize,
    assistant_messages: usize,
    quiet: bool,
    dry_run: bool,
    flush_every: usize,
    user_id: String,
}

impl MessageProcessor {
    #[must_use]
    pub fn new(sink: Arc<dyn TelemetrySink>, config: &MonitorConfig) -> Self {
        Self {
            sink,
            seen: ProcessedSet::new(PROCESSED_CAPACITY),
            processed_total: 0,
            user_messages: 0,
            assistant_messages: 0,
            quiet: config.quiet,
            dry_run: config.dry_run,
            flush_every: config.flush_every.max(1),
            user_id: config.user_id.clone(),
        }
    }

    /// Process one parsed entry.
    ///
    /// Non-message entries and duplicates are no-ops. Forwarding errors are
    /// logged and never halt subsequent processing.
    pub async fn handle(&mut self, entry: &LogEntry, ctx: &FileContext) {
        match entry {
            LogEntry::User(message) => self.handle_message(Role::User, message, ctx).await,
            LogEntry::Assistant(message) => {
                self.handle_message(Role::Assistant, message, ctx).await;
            }
            LogEntry::Other => {}
        }
    }

    async fn handle_message(&mut self, role: Role, message: &MessageEntry, ctx: &FileContext) {
        let Some(id) = message.uuid.as_deref() else {
            tracing::debug!(
                conversation = %ctx.conversation_id,
                "Dropping entry without id"
            );
            return;
        };

        // Marked before any further work: at most one forward per id, even
        // when the forward itself fails.
        if !self.seen.insert(id) {
            return;
        }
        self.processed_total += 1;
        match role {
            Role::User => self.user_messages += 1,
            Role::Assistant => self.assistant_messages += 1,
        }

        let text = message.text();

        if !self.quiet {
            let icon = match role {
                Role::User => "👤",
                Role::Assistant => "🤖",
            };
            display::print_message_preview(icon, project_tail(&ctx.project_path), &text);
        }

        if !self.dry_run {
            self.forward(role, message, id, text, ctx).await;
        }

        if self.processed_total % self.flush_every == 0 {
            if let Err(e) = self.sink.flush().await {
                tracing::warn!(error = %e, "Flush request failed");
            }
        }
    }

    async fn forward(
        &self,
        role: Role,
        message: &MessageEntry,
        id: &str,
        text: String,
        ctx: &FileContext,
    ) {
        let timestamp = message.timestamp.unwrap_or_else(Utc::now);

        let result = match role {
            Role::User => {
                self.sink
                    .trace(TraceRecord {
                        id: id.to_string(),
                        name: TRACE_NAME,
                        session_id: ctx.session_id.clone(),
                        user_id: self.user_id.clone(),
                        input: text,
                        metadata: TraceMetadata {
                            project: ctx.project_path.clone(),
                            conversation_id: ctx.conversation_id.clone(),
                            git_branch: message.git_branch.clone(),
                            cwd: message.cwd.clone(),
                        },
                        timestamp,
                    })
                    .await
            }
            Role::Assistant => {
                self.sink
                    .generation(GenerationRecord {
                        id: id.to_string(),
                        trace_id: message.parent_uuid.clone(),
                        name: GENERATION_NAME,
                        model: message.model().map(String::from),
                        output: text,
                        metadata: GenerationMetadata {
                            project: ctx.project_path.clone(),
                            conversation_id: ctx.conversation_id.clone(),
                            request_id: message.request_id.clone(),
                        },
                        start_time: timestamp,
                        end_time: timestamp,
                    })
                    .await
            }
        };

        if let Err(e) = result {
            tracing::warn!(id = %id, error = %e, "Forwarding failed, record dropped");
        }
    }

    #[must_use]
    pub fn stats(&self) -> ProcessorStats {
        ProcessorStats {
            user_messages: self.user_messages,
            assistant_messages: self.assistant_messages,
            processed: self.processed_total,
        }
    }
}

/// Last segment of a decoded project path, for compact display.
fn project_tail(project_path: &str) -> &str {
    project_path.rsplit('/').next().unwrap_or(project_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::MemorySink;
    use crate::watcher::parse_content;

    fn ctx() -> FileContext {
        FileContext {
            session_id: "abc123".to_string(),
            project_path: "a/b/c".to_string(),
            conversation_id: "conv1".to_string(),
        }
    }

    fn processor(sink: Arc<MemorySink>, config: &MonitorConfig) -> MessageProcessor {
        MessageProcessor::new(sink, config)
    }

    fn quiet_config() -> MonitorConfig {
        MonitorConfig {
            quiet: true,
            ..MonitorConfig::default()
        }
    }

    fn user_line(id: &str, text: &str) -> LogEntry {
        let json = format!(r#"{{"type":"user","uuid":"{id}","message":"{text}"}}"#);
        serde_json::from_str(&json).unwrap()
    }

    #[tokio::test]
    async fn test_user_message_forwards_trace() {
        let sink = Arc::new(MemorySink::new());
        let mut processor = processor(sink.clone(), &quiet_config());

        processor.handle(&user_line("m1", "hi"), &ctx()).await;

        let traces = sink.traces();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].id, "m1");
        assert_eq!(traces[0].input, "hi");
        assert_eq!(traces[0].session_id, "abc123");
        assert_eq!(traces[0].user_id, "claude-code-user");
        assert_eq!(traces[0].metadata.project, "a/b/c");
        assert_eq!(processor.stats().user_messages, 1);
    }

    #[tokio::test]
    async fn test_assistant_message_forwards_generation() {
        let sink = Arc::new(MemorySink::new());
        let mut processor = processor(sink.clone(), &quiet_config());

        let json = r#"{"type":"assistant","uuid":"m2","parentUuid":"m1","requestId":"req-7","timestamp":"2026-08-01T10:00:01Z","message":{"content":[{"type":"text","text":"hello"}],"model":"claude-sonnet-4"}}"#;
        let entry: LogEntry = serde_json::from_str(json).unwrap();
        processor.handle(&entry, &ctx()).await;

        let generations = sink.generations();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0].id, "m2");
        assert_eq!(generations[0].trace_id.as_deref(), Some("m1"));
        assert_eq!(generations[0].model.as_deref(), Some("claude-sonnet-4"));
        assert_eq!(generations[0].output, "hello");
        assert_eq!(generations[0].metadata.request_id.as_deref(), Some("req-7"));
        assert_eq!(generations[0].start_time, generations[0].end_time);
        assert_eq!(processor.stats().assistant_messages, 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_forwards_once() {
        let sink = Arc::new(MemorySink::new());
        let mut processor = processor(sink.clone(), &quiet_config());

        processor.handle(&user_line("m1", "first"), &ctx()).await;
        // Same id with a different payload is still a duplicate.
        processor.handle(&user_line("m1", "second"), &ctx()).await;

        assert_eq!(sink.traces().len(), 1);
        assert_eq!(sink.traces()[0].input, "first");
        assert_eq!(processor.stats().user_messages, 1);
    }

    #[tokio::test]
    async fn test_entry_without_id_is_dropped() {
        let sink = Arc::new(MemorySink::new());
        let mut processor = processor(sink.clone(), &quiet_config());

        let entry: LogEntry =
            serde_json::from_str(r#"{"type":"user","message":"no id"}"#).unwrap();
        processor.handle(&entry, &ctx()).await;

        assert!(sink.traces().is_empty());
        assert_eq!(processor.stats().processed, 0);
    }

    #[tokio::test]
    async fn test_other_kind_causes_no_state_change() {
        let sink = Arc::new(MemorySink::new());
        let mut processor = processor(sink.clone(), &quiet_config());

        let entries = parse_content(r#"{"type":"summary","summary":"s","leafUuid":"1"}"#);
        for entry in &entries {
            processor.handle(entry, &ctx()).await;
        }

        assert!(sink.traces().is_empty());
        assert!(sink.generations().is_empty());
        assert_eq!(processor.stats().processed, 0);
    }

    #[tokio::test]
    async fn test_dry_run_skips_forwarding_but_marks_id() {
        let sink = Arc::new(MemorySink::new());
        let config = MonitorConfig {
            quiet: true,
            dry_run: true,
            ..MonitorConfig::default()
        };
        let mut processor = processor(sink.clone(), &config);

        processor.handle(&user_line("m1", "hi"), &ctx()).await;
        processor.handle(&user_line("m1", "hi"), &ctx()).await;

        assert!(sink.traces().is_empty());
        assert_eq!(processor.stats().processed, 1);
    }

    #[tokio::test]
    async fn test_forwarding_failure_keeps_id_marked() {
        let sink = Arc::new(MemorySink::failing());
        let mut processor = processor(sink.clone(), &quiet_config());

        processor.handle(&user_line("m1", "hi"), &ctx()).await;
        // The failed forward is not retried for the same id.
        processor.handle(&user_line("m1", "hi"), &ctx()).await;

        assert!(sink.traces().is_empty());
        assert_eq!(processor.stats().processed, 1);
    }

    #[tokio::test]
    async fn test_flush_requested_every_tenth_message() {
        let sink = Arc::new(MemorySink::new());
        let mut processor = processor(sink.clone(), &quiet_config());

        for i in 0..25 {
            processor.handle(&user_line(&format!("m{i}"), "hi"), &ctx()).await;
        }

        assert_eq!(sink.flush_count(), 2);
        assert_eq!(processor.stats().processed, 25);
    }

    #[tokio::test]
    async fn test_non_quiet_mode_processes_identically() {
        let sink = Arc::new(MemorySink::new());
        let config = MonitorConfig::default();
        let mut processor = processor(sink.clone(), &config);

        processor
            .handle(&user_line("m1", "multi\\nline preview"), &ctx())
            .await;

        assert_eq!(sink.traces().len(), 1);
        assert_eq!(processor.stats().user_messages, 1);
    }

    #[test]
    fn test_processed_set_dedup_and_eviction() {
        let mut set = ProcessedSet::new(3);

        assert!(set.insert("a"));
        assert!(!set.insert("a"));
        assert!(set.insert("b"));
        assert!(set.insert("c"));
        assert_eq!(set.len(), 3);

        // Capacity reached: oldest id falls out first.
        assert!(set.insert("d"));
        assert_eq!(set.len(), 3);
        assert!(!set.contains("a"));
        assert!(set.contains("d"));
    }

    #[test]
    fn test_project_tail() {
        assert_eq!(project_tail("a/b/c"), "c");
        assert_eq!(project_tail("single"), "single");
        assert_eq!(project_tail(""), "");
    }
}
