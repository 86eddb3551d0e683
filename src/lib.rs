//! Claude Relay - mirrors Claude Code conversations into Langfuse telemetry.

pub mod config;
pub mod display;
pub mod monitor;
pub mod telemetry;
pub mod watcher;
