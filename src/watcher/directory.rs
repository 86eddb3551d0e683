//! Recursive directory watcher with debounced change events.
//!
//! Emits one event per changed conversation file once writes have settled
//! for the quiet period, so a file mid-append is never surfaced.

use std::path::PathBuf;
use std::time::Duration;

use notify_debouncer_full::{
    new_debouncer,
    notify::{EventKind, RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use tokio::sync::mpsc;

use super::error::WatcherError;

/// Quiet period a file must stay stable before its change surfaces.
pub const QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Events emitted by the directory watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// A conversation file was created or modified.
    FileChanged(PathBuf),
    /// An error occurred during watching.
    Error(WatcherError),
}

/// Watches a root directory tree for conversation file changes.
pub struct DirectoryWatcher {
    root: PathBuf,
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl DirectoryWatcher {
    /// Start watching `root` recursively.
    ///
    /// Returns the watcher and a receiver for change events. Dropping the
    /// watcher stops event delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist or the platform watcher
    /// cannot be created.
    pub fn new(
        root: PathBuf,
        quiet_period: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>), WatcherError> {
        if !root.is_dir() {
            return Err(WatcherError::RootNotFound(root));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(
            quiet_period,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in &events {
                        if !matches!(
                            event.kind,
                            EventKind::Create(_) | EventKind::Modify(_)
                        ) {
                            continue;
                        }
                        for path in &event.paths {
                            if path.extension().is_some_and(|ext| ext == "jsonl") {
                                let _ = event_tx.send(WatchEvent::FileChanged(path.clone()));
                            }
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        let _ = event_tx.send(WatchEvent::Error(WatcherError::Notify(error)));
                    }
                }
            },
        )?;

        debouncer.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                root,
                _debouncer: debouncer,
            },
            event_rx,
        ))
    }

    /// Root directory being watched.
    #[must_use]
    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}
