//! Side, source mode and sampling policy enums

use serde::{Deserialize, Serialize};
use std::fmt;

/// Book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Resting buy interest, best = highest price
    #[serde(alias = "buy")]
    Bid,
    /// Resting sell interest, best = lowest price
    #[serde(alias = "sell")]
    Ask,
}

impl Side {
    /// Returns the side name as used in column headers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bid => "bid",
            Self::Ask => "ask",
        }
    }

    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a delta source delivers events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Open-ended, real-time delivery
    Live,
    /// Historical delivery bounded by a start and end timestamp
    Replay,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Replay => write!(f, "replay"),
        }
    }
}

/// Where the first sampling boundary is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Floor the first event timestamp to a whole multiple of the interval
    /// since the Unix epoch (a 1m interval lands on minute marks)
    #[default]
    Epoch,
    /// Start counting intervals exactly at the first event
    FirstEvent,
}

/// What to emit when one delta crosses several boundaries at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// One record per crossed boundary, each carrying the current state
    #[default]
    ForwardFill,
    /// Only the most recent crossed boundary is emitted
    LatestOnly,
}

/// Which instant a snapshot record's `timestamp` carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stamp {
    /// The boundary instant itself
    #[default]
    Boundary,
    /// The exchange timestamp of the delta that crossed the boundary
    Trigger,
}
