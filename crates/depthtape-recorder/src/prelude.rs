//! Re-exports for convenience
//!
//! ```
//! use depthtape_recorder::prelude::*;
//! ```

// Recorder
pub use crate::config::{ConfigError, Mode, RecorderBuilder, RecorderConfig, ReplayRange};
pub use crate::error::RecorderError;
pub use crate::recorder::{ExitReason, Recorder, RunSummary, ShutdownHandle};

// Sources and sinks
pub use crate::sink::{CsvSink, MemorySink, SinkStats, SnapshotSink};
pub use crate::source::{
    BlockingLinesSource, ChannelSource, DeltaSource, JsonLinesSource, LiveFeed, ReplaySource,
};

// Diagnostics
pub use crate::diagnostics::{DiagnosticLevel, Diagnostics, MemoryDiagnostics, TracingDiagnostics};

// Data model
pub use depthtape_book::{Sampler, SamplerConfig};
pub use depthtape_types::{
    Alignment, BookDelta, BookLevel, GapPolicy, Instrument, LevelPair, Side, SnapshotRecord,
    SourceError, SourceMode, Stamp, Timestamp,
};

// Decimal for prices/amounts
pub use rust_decimal::Decimal;
