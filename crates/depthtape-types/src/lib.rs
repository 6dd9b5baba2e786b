//! Shared types for the depthtape snapshot recorder
//!
//! This crate provides the data model used across the workspace.
//! It has minimal dependencies and can be used independently.
//!
//! # Key Types
//!
//! - [`BookDelta`] - A single price level change on one side of the book
//! - [`BookLevel`], [`LevelPair`] - Price levels with decimal precision
//! - [`SnapshotRecord`] - A depth-limited, point-in-time sample of the book
//! - [`Side`], [`Alignment`], [`GapPolicy`], [`Stamp`] - Sampling enums
//! - [`Instrument`] - Exchange plus symbol identifying one tracked book
//! - [`DeltaError`], [`SourceError`], [`SinkError`] - Error types

pub mod delta;
pub mod enums;
pub mod error;
pub mod instrument;
pub mod level;
pub mod snapshot;

// Re-export commonly used types
pub use delta::*;
pub use enums::*;
pub use error::*;
pub use instrument::*;
pub use level::*;
pub use snapshot::*;

// Re-export for users
pub use chrono::{DateTime, Utc};
pub use rust_decimal::Decimal;

/// Instant type used for every timestamp in the data model
pub type Timestamp = DateTime<Utc>;
