//! Session identity resolution.
//!
//! Maps each conversation file to a stable session id for the life of the
//! run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// FNV-1a 64-bit. Fast, deterministic, non-cryptographic string hash.
fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Digest identifying the session for one (project, conversation) pair.
///
/// Always 16 hex characters. Collisions are accepted at the expected scale
/// of tens of thousands of sessions.
#[must_use]
pub fn session_digest(project_path: &str, conversation_id: &str) -> String {
    let key = format!("{project_path}:{conversation_id}");
    format!("{:016x}", fnv1a_64(key.as_bytes()))
}

/// Cached mapping from file path to session id.
///
/// One entry per conversation file, kept for the run; growth is bounded by
/// the number of files seen.
#[derive(Debug, Default)]
pub struct SessionResolver {
    cache: HashMap<PathBuf, String>,
}

impl SessionResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the session id for a conversation file, caching by path.
    pub fn resolve(
        &mut self,
        file_path: &Path,
        project_path: &str,
        conversation_id: &str,
    ) -> String {
        if let Some(id) = self.cache.get(file_path) {
            return id.clone();
        }
        let id = session_digest(project_path, conversation_id);
        self.cache.insert(file_path.to_path_buf(), id.clone());
        id
    }

    /// Number of cached sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_fixed_length_hex() {
        let digest = session_digest("a/b/c", "conv1");
        assert_eq!(digest.len(), 16);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(
            session_digest("a/b/c", "conv1"),
            session_digest("a/b/c", "conv1")
        );
    }

    #[test]
    fn test_distinct_pairs_yield_distinct_digests() {
        let a = session_digest("a/b/c", "conv1");
        let b = session_digest("a/b/c", "conv2");
        let c = session_digest("x/y", "conv1");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut resolver = SessionResolver::new();
        let path = Path::new("/root/projects/a-b-c/conv1.jsonl");

        let first = resolver.resolve(path, "a/b/c", "conv1");
        let second = resolver.resolve(path, "a/b/c", "conv1");

        assert_eq!(first, second);
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_resolve_caches_by_file_path() {
        let mut resolver = SessionResolver::new();
        let path = Path::new("/root/projects/a-b-c/conv1.jsonl");

        let first = resolver.resolve(path, "a/b/c", "conv1");
        // Same path wins over a differing pair within a run.
        let second = resolver.resolve(path, "other", "pair");

        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_distinct_paths() {
        let mut resolver = SessionResolver::new();

        let a = resolver.resolve(Path::new("/r/projects/p1/c1.jsonl"), "p1", "c1");
        let b = resolver.resolve(Path::new("/r/projects/p2/c2.jsonl"), "p2", "c2");

        assert_ne!(a, b);
        assert_eq!(resolver.len(), 2);
    }
}
