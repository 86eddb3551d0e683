//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Langfuse backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LangfuseConfig {
    /// Base URL of the backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable name for the public key.
    #[serde(default = "default_public_key_env")]
    pub public_key_env: String,
    /// Environment variable name for the secret key.
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
}

fn default_base_url() -> String {
    "https://cloud.langfuse.com".to_string()
}

fn default_public_key_env() -> String {
    "LANGFUSE_PUBLIC_KEY".to_string()
}

fn default_secret_key_env() -> String {
    "LANGFUSE_SECRET_KEY".to_string()
}

impl Default for LangfuseConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            public_key_env: default_public_key_env(),
            secret_key_env: default_secret_key_env(),
        }
    }
}

/// Monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Conversation root; `~/.claude` when unset.
    pub claude_dir: Option<PathBuf>,
    /// Catch-up window in hours; zero or negative disables backfill.
    pub lookback_hours: i64,
    /// Suppress the per-message echo line.
    pub quiet: bool,
    /// Process everything but never call the backend.
    pub dry_run: bool,
    /// Request a sink flush every N processed messages.
    pub flush_every: usize,
    /// User identity attached to every trace.
    pub user_id: String,
    /// Backend connection settings.
    pub langfuse: LangfuseConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            claude_dir: None,
            lookback_hours: 24,
            quiet: false,
            dry_run: false,
            flush_every: 10,
            user_id: "claude-code-user".to_string(),
            langfuse: LangfuseConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Resolve the watch root: explicit override or `~/.claude`.
    #[must_use]
    pub fn root_dir(&self) -> PathBuf {
        self.claude_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".claude")
        })
    }
}
