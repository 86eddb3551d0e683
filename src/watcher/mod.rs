//! Watching and parsing of Claude Code conversation files.

mod directory;
mod error;
mod history;
mod jsonl;

pub use directory::{DirectoryWatcher, WatchEvent, QUIET_PERIOD};
pub use error::WatcherError;
pub use history::scan_history;
pub use jsonl::*;
