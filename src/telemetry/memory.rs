//! In-process recording sink.
//!
//! Backs dry-run mode (all local processing, zero network effect) and
//! doubles as the observable sink for tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::records::{GenerationRecord, TraceRecord};
use super::sink::{SinkError, TelemetrySink};

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<Inner>,
    fail_forwards: bool,
}

#[derive(Debug, Default)]
struct Inner {
    traces: Vec<TraceRecord>,
    generations: Vec<GenerationRecord>,
    flushes: usize,
    shutdowns: usize,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose record operations always fail, for error-path tests.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            inner: Mutex::default(),
            fail_forwards: true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Traces recorded so far.
    #[must_use]
    pub fn traces(&self) -> Vec<TraceRecord> {
        self.lock().traces.clone()
    }

    /// Generations recorded so far.
    #[must_use]
    pub fn generations(&self) -> Vec<GenerationRecord> {
        self.lock().generations.clone()
    }

    /// Number of flush requests received.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }

    /// Number of shutdown handshakes received.
    #[must_use]
    pub fn shutdown_count(&self) -> usize {
        self.lock().shutdowns
    }
}

#[async_trait]
impl TelemetrySink for MemorySink {
    async fn trace(&self, record: TraceRecord) -> Result<(), SinkError> {
        if self.fail_forwards {
            return Err(SinkError::RequestFailed("induced failure".to_string()));
        }
        self.lock().traces.push(record);
        Ok(())
    }

    async fn generation(&self, record: GenerationRecord) -> Result<(), SinkError> {
        if self.fail_forwards {
            return Err(SinkError::RequestFailed("induced failure".to_string()));
        }
        self.lock().generations.push(record);
        Ok(())
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.lock().flushes += 1;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), SinkError> {
        self.lock().shutdowns += 1;
        Ok(())
    }
}
