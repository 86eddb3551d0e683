//! One-shot historical scan for catch-up backfill.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

/// Recursively list `.jsonl` files under `root` whose last-modified time is
/// at or after `cutoff`.
///
/// Traversal order is unspecified. Unreadable entries are skipped.
#[must_use]
pub fn scan_history(root: &Path, cutoff: SystemTime) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable entry in history scan");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "jsonl"))
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            (modified >= cutoff).then(|| e.into_path())
        })
        .collect()
}
