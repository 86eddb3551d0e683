//! Monitoring engine: backfill, watch loop, diagnostics, and shutdown.

mod files;
mod processor;
mod session;

pub use files::{conversation_identity, decode_project_segment, FileProcessor, PROJECTS_ANCHOR};
pub use processor::{FileContext, MessageProcessor, ProcessedSet, ProcessorStats};
pub use session::{session_digest, SessionResolver};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::telemetry::TelemetrySink;
use crate::watcher::{scan_history, DirectoryWatcher, WatchEvent, WatcherError, QUIET_PERIOD};

/// Errors that stop the monitor before it starts watching.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Conversation root does not exist.
    #[error("Conversation root not found: {0}")]
    MissingRoot(PathBuf),

    /// Watcher could not be started.
    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

/// Long-running monitor over one conversation root.
///
/// All run state (session cache, dedup set, counters) lives on this
/// instance; independent monitors never share state.
pub struct Monitor {
    root: PathBuf,
    config: MonitorConfig,
    files: FileProcessor,
    sink: Arc<dyn TelemetrySink>,
    cancel: CancellationToken,
}

impl Monitor {
    #[must_use]
    pub fn new(config: MonitorConfig, sink: Arc<dyn TelemetrySink>) -> Self {
        let root = config.root_dir();
        let files = FileProcessor::new(Arc::clone(&sink), &config);
        Self {
            root,
            config,
            files,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the watch loop when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Root directory being monitored.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run counters so far.
    #[must_use]
    pub fn stats(&self) -> ProcessorStats {
        self.files.stats()
    }

    /// Catch up on files modified within the configured lookback window.
    pub async fn backfill(&mut self) {
        let hours = self.config.lookback_hours;
        if hours <= 0 {
            tracing::debug!("Backfill disabled");
            return;
        }

        let window = Duration::from_secs(hours.unsigned_abs() * 3600);
        let cutoff = SystemTime::now()
            .checked_sub(window)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let paths = scan_history(&self.root, cutoff);
        tracing::info!(files = paths.len(), hours, "Backfilling recent history");

        for path in paths {
            self.files.process_path(&path).await;
        }
    }

    /// Run until interrupted: fail-fast root check, backfill, then live
    /// watching. A file begun is always driven to completion; the final
    /// flush and shutdown handshake run even when interrupted mid-stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory is missing or the watcher
    /// cannot be started.
    pub async fn run(&mut self) -> Result<(), MonitorError> {
        if !self.root.is_dir() {
            return Err(MonitorError::MissingRoot(self.root.clone()));
        }

        self.backfill().await;

        let (watcher, mut events) = DirectoryWatcher::new(self.root.clone(), QUIET_PERIOD)?;
        tracing::info!(root = %watcher.root().display(), "Watching for conversation changes");

        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        tracing::warn!(error = %e, "Signal handler failed");
                    }
                    break;
                }
                event = events.recv() => match event {
                    Some(WatchEvent::FileChanged(path)) => self.files.process_path(&path).await,
                    Some(WatchEvent::Error(e)) => tracing::warn!(error = %e, "Watcher error"),
                    None => break,
                },
            }
        }

        drop(watcher);
        self.finish().await;
        Ok(())
    }

    /// Final flush and shutdown handshake; best-effort, always logged.
    async fn finish(&self) {
        if let Err(e) = self.sink.flush().await {
            tracing::warn!(error = %e, "Final flush failed");
        }
        if let Err(e) = self.sink.shutdown().await {
            tracing::warn!(error = %e, "Sink shutdown failed");
        }

        let stats = self.files.stats();
        tracing::info!(
            user_messages = stats.user_messages,
            assistant_messages = stats.assistant_messages,
            "Monitor stopped"
        );
    }
}

/// Readiness diagnostics for the `status` command.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub root: PathBuf,
    pub root_present: bool,
    pub public_key_present: bool,
    pub secret_key_present: bool,
    pub base_url: String,
    pub base_url_valid: bool,
}

impl StatusReport {
    /// Gather diagnostics without touching the network.
    #[must_use]
    pub fn gather(config: &MonitorConfig) -> Self {
        let root = config.root_dir();
        Self {
            root_present: root.is_dir(),
            root,
            public_key_present: std::env::var(&config.langfuse.public_key_env).is_ok(),
            secret_key_present: std::env::var(&config.langfuse.secret_key_env).is_ok(),
            base_url_valid: url::Url::parse(&config.langfuse.base_url).is_ok(),
            base_url: config.langfuse.base_url.clone(),
        }
    }

    /// True when watching could start with this configuration.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.root_present
            && self.public_key_present
            && self.secret_key_present
            && self.base_url_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LangfuseConfig;
    use crate::telemetry::MemorySink;
    use tempfile::TempDir;

    fn config_for(root: &Path) -> MonitorConfig {
        MonitorConfig {
            claude_dir: Some(root.to_path_buf()),
            quiet: true,
            ..MonitorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_fails_fast_on_missing_root() {
        let config = MonitorConfig {
            claude_dir: Some(PathBuf::from("/tmp/nonexistent-relay-root-777")),
            ..MonitorConfig::default()
        };
        let mut monitor = Monitor::new(config, Arc::new(MemorySink::new()));

        let result = monitor.run().await;
        assert!(matches!(result, Err(MonitorError::MissingRoot(_))));
    }

    #[tokio::test]
    async fn test_backfill_disabled_when_lookback_zero() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("projects").join("a-b");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("conv1.jsonl"),
            r#"{"type":"user","uuid":"m1","message":"hi"}"#,
        )
        .unwrap();

        let sink = Arc::new(MemorySink::new());
        let config = MonitorConfig {
            lookback_hours: 0,
            ..config_for(temp.path())
        };
        let mut monitor = Monitor::new(config, sink.clone());
        monitor.backfill().await;

        assert!(sink.traces().is_empty());
    }

    #[tokio::test]
    async fn test_backfill_processes_recent_files() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("projects").join("a-b");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("conv1.jsonl"),
            r#"{"type":"user","uuid":"m1","message":"hi"}"#,
        )
        .unwrap();

        let sink = Arc::new(MemorySink::new());
        let mut monitor = Monitor::new(config_for(temp.path()), sink.clone());
        monitor.backfill().await;

        assert_eq!(sink.traces().len(), 1);
        assert_eq!(monitor.stats().user_messages, 1);
    }

    #[tokio::test]
    async fn test_independent_monitors_share_no_state() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("projects").join("a-b");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("conv1.jsonl"),
            r#"{"type":"user","uuid":"m1","message":"hi"}"#,
        )
        .unwrap();

        let sink_a = Arc::new(MemorySink::new());
        let sink_b = Arc::new(MemorySink::new());
        let mut a = Monitor::new(config_for(temp.path()), sink_a.clone());
        let mut b = Monitor::new(config_for(temp.path()), sink_b.clone());

        a.backfill().await;
        b.backfill().await;

        assert_eq!(sink_a.traces().len(), 1);
        assert_eq!(sink_b.traces().len(), 1);
    }

    #[test]
    fn test_status_report_missing_everything() {
        let config = MonitorConfig {
            claude_dir: Some(PathBuf::from("/tmp/nonexistent-relay-root-778")),
            langfuse: LangfuseConfig {
                base_url: "https://cloud.langfuse.com".to_string(),
                public_key_env: "TEST_RELAY_STATUS_MISSING_PK".to_string(),
                secret_key_env: "TEST_RELAY_STATUS_MISSING_SK".to_string(),
            },
            ..MonitorConfig::default()
        };
        std::env::remove_var("TEST_RELAY_STATUS_MISSING_PK");
        std::env::remove_var("TEST_RELAY_STATUS_MISSING_SK");

        let report = StatusReport::gather(&config);
        assert!(!report.root_present);
        assert!(!report.public_key_present);
        assert!(!report.secret_key_present);
        assert!(report.base_url_valid);
        assert!(!report.ready());
    }

    #[test]
    fn test_status_report_ready() {
        let temp = TempDir::new().unwrap();
        let config = MonitorConfig {
            claude_dir: Some(temp.path().to_path_buf()),
            langfuse: LangfuseConfig {
                base_url: "http://localhost:3000".to_string(),
                public_key_env: "TEST_RELAY_STATUS_PK".to_string(),
                secret_key_env: "TEST_RELAY_STATUS_SK".to_string(),
            },
            ..MonitorConfig::default()
        };
        std::env::set_var("TEST_RELAY_STATUS_PK", "pk");
        std::env::set_var("TEST_RELAY_STATUS_SK", "sk");

        let report = StatusReport::gather(&config);
        assert!(report.ready());

        std::env::remove_var("TEST_RELAY_STATUS_PK");
        std::env::remove_var("TEST_RELAY_STATUS_SK");
    }

    #[test]
    fn test_status_report_invalid_base_url() {
        let config = MonitorConfig {
            langfuse: LangfuseConfig {
                base_url: "not a url".to_string(),
                ..LangfuseConfig::default()
            },
            ..MonitorConfig::default()
        };

        let report = StatusReport::gather(&config);
        assert!(!report.base_url_valid);
        assert!(!report.ready());
    }
}
