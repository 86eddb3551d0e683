//! Langfuse batch-ingestion sink.
//!
//! Records are wrapped in ingestion events and handed to a background
//! worker that owns buffering, batching, retry, and the shutdown drain.
//! Submission and flush are enqueue-only and never touch the network.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

use crate::config::LangfuseConfig;

use super::records::{GenerationRecord, TraceRecord};
use super::sink::{SinkError, TelemetrySink};

/// Connection timeout for HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout for HTTP requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Buffered events that force a batch send even without a flush request.
const BATCH_LIMIT: usize = 100;

/// Build an HTTP client with proper timeout configuration.
fn build_http_client() -> Result<Client, SinkError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| SinkError::RequestFailed(e.to_string()))
}

/// Determine if a request should be retried based on status code and attempt count.
fn should_retry(status_code: u16, attempt: u32) -> bool {
    if attempt >= MAX_RETRIES {
        return false;
    }
    // Retry on 5xx server errors
    (500..600).contains(&status_code)
}

/// Calculate exponential backoff duration for retry attempts.
fn calculate_backoff(attempt: u32) -> Duration {
    // Exponential backoff: 1s, 2s, 4s
    Duration::from_secs(1 << attempt)
}

fn ingestion_endpoint(base_url: &str) -> Result<Url, SinkError> {
    let base = Url::parse(base_url)?;
    Ok(base.join("/api/public/ingestion")?)
}

/// One entry in an ingestion batch.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum IngestionEvent {
    TraceCreate(Envelope<TraceRecord>),
    GenerationCreate(Envelope<GenerationRecord>),
}

/// Event envelope: unique id, submission time, record body.
#[derive(Debug, Serialize)]
struct Envelope<T> {
    id: String,
    timestamp: String,
    body: T,
}

impl<T> Envelope<T> {
    fn new(body: T) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            body,
        }
    }
}

#[derive(Debug, Serialize)]
struct IngestionBatch {
    batch: Vec<IngestionEvent>,
}

enum Command {
    Event(IngestionEvent),
    Flush,
    Shutdown,
}

/// Sink that forwards records to the Langfuse ingestion API.
pub struct LangfuseSink {
    tx: mpsc::UnboundedSender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LangfuseSink {
    /// Build a sink from config, reading credentials from the environment,
    /// and spawn its background worker.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential environment variable is unset, the
    /// base URL is invalid, or the HTTP client cannot be built.
    pub fn from_config(config: &LangfuseConfig) -> Result<Self, SinkError> {
        let public_key = std::env::var(&config.public_key_env)
            .map_err(|_| SinkError::MissingCredentials(config.public_key_env.clone()))?;
        let secret_key = std::env::var(&config.secret_key_env)
            .map_err(|_| SinkError::MissingCredentials(config.secret_key_env.clone()))?;

        let transport = Transport {
            client: build_http_client()?,
            endpoint: ingestion_endpoint(&config.base_url)?,
            public_key,
            secret_key,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, transport));

        Ok(Self {
            tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    fn send(&self, command: Command) -> Result<(), SinkError> {
        self.tx.send(command).map_err(|_| SinkError::QueueClosed)
    }
}

#[async_trait]
impl TelemetrySink for LangfuseSink {
    async fn trace(&self, record: TraceRecord) -> Result<(), SinkError> {
        self.send(Command::Event(IngestionEvent::TraceCreate(Envelope::new(
            record,
        ))))
    }

    async fn generation(&self, record: GenerationRecord) -> Result<(), SinkError> {
        self.send(Command::Event(IngestionEvent::GenerationCreate(
            Envelope::new(record),
        )))
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.send(Command::Flush)
    }

    async fn shutdown(&self) -> Result<(), SinkError> {
        self.send(Command::Shutdown)?;
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| SinkError::RequestFailed(e.to_string()))?;
        }
        Ok(())
    }
}

struct Transport {
    client: Client,
    endpoint: Url,
    public_key: String,
    secret_key: String,
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Command>, transport: Transport) {
    let mut buffer: Vec<IngestionEvent> = Vec::new();

    while let Some(command) = rx.recv().await {
        match command {
            Command::Event(event) => {
                buffer.push(event);
                if buffer.len() >= BATCH_LIMIT {
                    transport.send_batch(&mut buffer).await;
                }
            }
            Command::Flush => transport.send_batch(&mut buffer).await,
            Command::Shutdown => break,
        }
    }

    // Final drain covers both the shutdown handshake and a dropped sink.
    transport.send_batch(&mut buffer).await;
}

impl Transport {
    /// Send everything buffered as one batch, retrying transient failures.
    /// A batch that still fails after retries is dropped with an error log.
    async fn send_batch(&self, buffer: &mut Vec<IngestionEvent>) {
        if buffer.is_empty() {
            return;
        }
        let payload = IngestionBatch {
            batch: std::mem::take(buffer),
        };
        let count = payload.batch.len();

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(self.endpoint.clone())
                .basic_auth(&self.public_key, Some(&self.secret_key))
                .json(&payload)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        tracing::debug!(events = count, "Ingestion batch accepted");
                        return;
                    }
                    if should_retry(status.as_u16(), attempt) {
                        tokio::time::sleep(calculate_backoff(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    let text = response.text().await.unwrap_or_default();
                    tracing::error!(%status, body = %text, events = count, "Ingestion batch rejected, dropping");
                    return;
                }
                Err(e) => {
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(calculate_backoff(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    tracing::error!(error = %e, events = count, "Ingestion batch failed, dropping");
                    return;
                }
            }
        }
    }
}
