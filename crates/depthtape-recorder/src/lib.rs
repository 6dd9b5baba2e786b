//! Async snapshot recorder
//!
//! This crate wires the synchronous sampler from `depthtape-book` to the
//! outside world: delta sources (replay files, stdin, live channels), snapshot
//! sinks (CSV files, memory) and an injected diagnostics logger.
//!
//! # Quick Start
//!
//! ```no_run
//! use depthtape_recorder::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RecorderBuilder::new("bybit", "BTCUSDT")
//!         .with_depth(10)
//!         .with_interval_ms(60_000)
//!         .build()?;
//!
//!     let source = JsonLinesSource::open("deltas.jsonl").await?;
//!     let sink = CsvSink::open(config.output_path(), config.depth).await?;
//!     let diagnostics = Arc::new(TracingDiagnostics::new(&config.instrument()));
//!
//!     let recorder = Recorder::new(config, source, sink, diagnostics)?;
//!     let summary = recorder.run().await?;
//!     println!("wrote {} snapshots", summary.sink.written);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Failure handling
//!
//! - **Malformed events**: rejected at the source, logged, and skipped
//! - **Sink failures**: logged; sampling continues
//! - **Source disconnects**: returned as [`RecorderError::Source`] with the
//!   last persisted timestamp to resume from

pub mod config;
pub mod csv;
pub mod diagnostics;
pub mod error;
pub mod prelude;
pub mod recorder;
pub mod sink;
pub mod source;

// Re-export main types
pub use config::{ConfigError, Mode, RecorderBuilder, RecorderConfig, ReplayRange};
pub use diagnostics::{DiagnosticLevel, Diagnostics, MemoryDiagnostics, TracingDiagnostics};
pub use error::RecorderError;
pub use recorder::{ExitReason, Recorder, RunSummary, ShutdownHandle};
pub use sink::{CsvSink, MemorySink, SinkStats, SinkWorker, SnapshotSink};
pub use source::{
    BlockingLinesSource, ChannelSource, DeltaSource, FeedError, JsonLinesSource, LiveFeed,
    ReplaySource,
};
