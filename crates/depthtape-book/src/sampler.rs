//! Interval snapshot sampler
//!
//! Drives a [`BookState`] from a delta stream and samples it once per fixed
//! interval boundary.
//!
//! # State Machine
//!
//! ```text
//! Idle ──first delta──► Tracking ──finish()──► Finished
//!   ▲                      │
//!   └──────reset()─────────┘
//! ```
//!
//! Sampling happens only when a delta arrives. The delta is applied first, then
//! every boundary at or before its exchange timestamp is emitted from the
//! post-application state.

use crate::storage::BookState;
use chrono::{DateTime, Duration};
use depthtape_types::{Alignment, BookDelta, GapPolicy, Side, SnapshotRecord, Stamp, Timestamp};
use std::iter::FusedIterator;

/// Sampler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerState {
    /// No delta observed yet
    #[default]
    Idle,
    /// Applying deltas and emitting on boundaries
    Tracking,
    /// Stream ended; further deltas are ignored
    Finished,
}

/// Invalid sampler parameters
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SamplerConfigError {
    #[error("depth must be at least 1")]
    ZeroDepth,

    #[error("interval must be at least 1 microsecond, got {0}")]
    IntervalTooShort(Duration),
}

/// Sampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    depth: usize,
    interval: Duration,
    alignment: Alignment,
    gap_policy: GapPolicy,
    stamp: Stamp,
}

impl SamplerConfig {
    /// Create a config with default alignment, gap policy and stamping
    pub fn new(depth: usize, interval: Duration) -> Result<Self, SamplerConfigError> {
        if depth == 0 {
            return Err(SamplerConfigError::ZeroDepth);
        }
        match interval.num_microseconds() {
            Some(us) if us >= 1 => {}
            _ => return Err(SamplerConfigError::IntervalTooShort(interval)),
        }

        Ok(Self {
            depth,
            interval,
            alignment: Alignment::default(),
            gap_policy: GapPolicy::default(),
            stamp: Stamp::default(),
        })
    }

    /// Set how the first boundary is anchored
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set what a multi-boundary gap emits
    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.gap_policy = gap_policy;
        self
    }

    /// Set which instant records are stamped with
    pub fn with_stamp(mut self, stamp: Stamp) -> Self {
        self.stamp = stamp;
        self
    }

    /// Levels reported per side
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Sampling interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn gap_policy(&self) -> GapPolicy {
        self.gap_policy
    }

    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    fn interval_us(&self) -> i64 {
        // Validated in `new`
        self.interval.num_microseconds().unwrap_or(1).max(1)
    }
}

/// Book state tracker that emits one snapshot per interval boundary
#[derive(Debug, Clone)]
pub struct Sampler {
    config: SamplerConfig,
    book: BookState,
    state: SamplerState,
    /// Next boundary in microseconds since the Unix epoch
    next_boundary_us: Option<i64>,
    /// Latest exchange timestamp seen
    high_water_us: Option<i64>,
    deltas_applied: u64,
    snapshots_emitted: u64,
    out_of_order: u64,
}

impl Sampler {
    /// Create an idle sampler with an empty book
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config,
            book: BookState::new(),
            state: SamplerState::Idle,
            next_boundary_us: None,
            high_water_us: None,
            deltas_applied: 0,
            snapshots_emitted: 0,
            out_of_order: 0,
        }
    }

    /// Get the sampling parameters
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Get the current state
    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Read access to the tracked book
    pub fn book(&self) -> &BookState {
        &self.book
    }

    /// Next boundary that will trigger a snapshot, once tracking
    pub fn next_boundary(&self) -> Option<Timestamp> {
        self.next_boundary_us.and_then(DateTime::from_timestamp_micros)
    }

    /// Deltas applied since creation
    pub fn deltas_applied(&self) -> u64 {
        self.deltas_applied
    }

    /// Records handed out by `consume` since creation
    pub fn snapshots_emitted(&self) -> u64 {
        self.snapshots_emitted
    }

    /// Deltas whose exchange timestamp went backwards
    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    /// Apply a delta and return the snapshots for every boundary it crossed
    ///
    /// The returned iterator owns its data. Sampler state has already advanced
    /// past the crossed boundaries when this returns, so dropping the iterator
    /// early discards records without desynchronizing later boundaries.
    pub fn consume(&mut self, delta: &BookDelta) -> Emissions {
        let ts_us = delta.exchange_timestamp.timestamp_micros();
        let interval_us = self.config.interval_us();

        let next_us = match (self.state, self.next_boundary_us) {
            (SamplerState::Finished, _) => return Emissions::empty(),
            (SamplerState::Tracking, Some(next_us)) => next_us,
            _ => {
                let start_us = match self.config.alignment {
                    Alignment::Epoch => ts_us - ts_us.rem_euclid(interval_us),
                    Alignment::FirstEvent => ts_us,
                };
                self.state = SamplerState::Tracking;
                start_us.saturating_add(interval_us)
            }
        };

        match self.high_water_us {
            Some(high) if ts_us < high => self.out_of_order += 1,
            _ => self.high_water_us = Some(ts_us),
        }

        self.book.apply_delta(delta);
        self.deltas_applied += 1;

        if ts_us < next_us {
            self.next_boundary_us = Some(next_us);
            return Emissions::empty();
        }

        let crossed = (ts_us - next_us) / interval_us + 1;
        self.next_boundary_us = Some(next_us.saturating_add(crossed.saturating_mul(interval_us)));

        let (first_us, count) = match self.config.gap_policy {
            GapPolicy::ForwardFill => (next_us, crossed as u64),
            GapPolicy::LatestOnly => (next_us + (crossed - 1) * interval_us, 1),
        };
        self.snapshots_emitted += count;

        let template = SnapshotRecord::from_sides(
            delta.exchange_timestamp,
            delta.local_timestamp,
            &self.book.top_levels(Side::Bid, self.config.depth),
            &self.book.top_levels(Side::Ask, self.config.depth),
            self.config.depth,
        );

        Emissions {
            template: Some(template),
            boundary_us: first_us,
            interval_us,
            remaining: count,
            stamp: self.config.stamp,
        }
    }

    /// End the stream; no partial snapshot is emitted
    pub fn finish(&mut self) {
        self.state = SamplerState::Finished;
    }

    /// Discard the book and boundaries and return to `Idle`
    ///
    /// Counters are cumulative and survive a reset.
    pub fn reset(&mut self) {
        self.book.clear();
        self.state = SamplerState::Idle;
        self.next_boundary_us = None;
        self.high_water_us = None;
    }
}

/// Snapshots produced by one [`Sampler::consume`] call, in boundary order
///
/// Every record carries the same levels: the state right after the delta that
/// crossed the boundaries.
#[derive(Debug, Clone)]
pub struct Emissions {
    template: Option<SnapshotRecord>,
    boundary_us: i64,
    interval_us: i64,
    remaining: u64,
    stamp: Stamp,
}

impl Emissions {
    fn empty() -> Self {
        Self {
            template: None,
            boundary_us: 0,
            interval_us: 0,
            remaining: 0,
            stamp: Stamp::default(),
        }
    }

    /// True when no boundary was crossed
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }
}

impl Iterator for Emissions {
    type Item = SnapshotRecord;

    fn next(&mut self) -> Option<SnapshotRecord> {
        if self.remaining == 0 {
            return None;
        }
        let template = self.template.as_ref()?;

        let mut record = template.clone();
        if self.stamp == Stamp::Boundary {
            if let Some(boundary) = DateTime::from_timestamp_micros(self.boundary_us) {
                record.timestamp = boundary;
            }
        }

        self.boundary_us = self.boundary_us.saturating_add(self.interval_us);
        self.remaining -= 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Emissions {}

impl FusedIterator for Emissions {}
