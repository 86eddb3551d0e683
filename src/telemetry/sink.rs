//! Telemetry sink abstraction.

use async_trait::async_trait;

use super::records::{GenerationRecord, TraceRecord};

/// Errors from sink operations.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// Required credential environment variable is unset.
    #[error("Missing credential (env: {0})")]
    MissingCredentials(String),

    /// Backend rejected or never received a request.
    #[error("Telemetry request failed: {0}")]
    RequestFailed(String),

    /// Background worker is gone; records can no longer be accepted.
    #[error("Telemetry queue closed")]
    QueueClosed,

    /// Backend base URL is not a valid URL.
    #[error("Invalid backend address: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Destination for trace and generation records.
///
/// Record submission and flush must not block on the network; transport
/// work belongs to a background worker.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Record one trace.
    async fn trace(&self, record: TraceRecord) -> Result<(), SinkError>;

    /// Record one generation.
    async fn generation(&self, record: GenerationRecord) -> Result<(), SinkError>;

    /// Request a best-effort flush of buffered records.
    async fn flush(&self) -> Result<(), SinkError>;

    /// Drain buffers and stop accepting records.
    async fn shutdown(&self) -> Result<(), SinkError>;
}
