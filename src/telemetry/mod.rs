//! Telemetry records and sinks.

mod langfuse;
mod memory;
mod records;
mod sink;

pub use langfuse::LangfuseSink;
pub use memory::MemorySink;
pub use records::{
    GenerationMetadata, GenerationRecord, TraceMetadata, TraceRecord, GENERATION_NAME, TRACE_NAME,
};
pub use sink::{SinkError, TelemetrySink};
