//! Incremental book state and interval snapshot sampler
//!
//! This crate holds the only stateful logic of depthtape: a per-side price
//! ladder mutated by book deltas, and a sampler that turns the irregular delta
//! stream into one [`SnapshotRecord`] per fixed interval boundary.
//!
//! # Constraints
//!
//! - NO `tokio`, NO I/O: `consume` never suspends and never fails
//! - NO `std::time::Instant`: all time comes from the deltas themselves
//!
//! # Example
//!
//! ```
//! use chrono::{DateTime, Duration};
//! use depthtape_book::{Sampler, SamplerConfig, SamplerState};
//! use depthtape_types::BookDelta;
//! use rust_decimal::Decimal;
//!
//! let config = SamplerConfig::new(1, Duration::minutes(1)).unwrap();
//! let mut sampler = Sampler::new(config);
//! assert_eq!(sampler.state(), SamplerState::Idle);
//!
//! let t0 = DateTime::from_timestamp_millis(0).unwrap();
//! let t1 = DateTime::from_timestamp_millis(60_000).unwrap();
//! assert_eq!(sampler.consume(&BookDelta::bid(t0, Decimal::from(100), Decimal::from(5))).count(), 0);
//!
//! let records: Vec<_> = sampler
//!     .consume(&BookDelta::ask(t1, Decimal::from(101), Decimal::from(3)))
//!     .collect();
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].timestamp, t1);
//! ```
//!
//! [`SnapshotRecord`]: depthtape_types::SnapshotRecord

pub mod sampler;
pub mod storage;

// Re-export main types
pub use sampler::{Emissions, Sampler, SamplerConfig, SamplerConfigError, SamplerState};
pub use storage::BookState;
