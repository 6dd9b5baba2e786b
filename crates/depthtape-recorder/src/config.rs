//! Recorder configuration
//!
//! A [`RecorderConfig`] can be loaded from JSON or assembled with the fluent
//! [`RecorderBuilder`]; both paths go through the same validation.
//!
//! In JSON a replay can be written either tagged or flat:
//!
//! ```json
//! {"mode": {"replay": {"from": "2024-03-01T00:00:00Z", "to": "2024-03-02T00:00:00Z"}}}
//! {"mode": "replay", "replayRange": {"from": "2024-03-01T00:00:00Z", "to": "2024-03-02T00:00:00Z"}}
//! ```
//!
//! # Example
//!
//! ```
//! use depthtape_recorder::config::RecorderBuilder;
//!
//! let config = RecorderBuilder::new("bybit", "BTCUSDT")
//!     .with_depth(5)
//!     .with_interval_ms(1_000)
//!     .with_output_dir("data/snapshots")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     config.output_path().to_str(),
//!     Some("data/snapshots/bybit_BTCUSDT_book_snapshot_5_1000ms.csv")
//! );
//! ```

use chrono::Duration;
use depthtape_book::SamplerConfig;
use depthtape_types::{Alignment, GapPolicy, Instrument, SourceMode, Stamp, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Exchange name missing
    #[error("exchange must not be empty")]
    EmptyExchange,

    /// Symbol missing
    #[error("symbol must not be empty")]
    EmptySymbol,

    /// Depth below one
    #[error("depth must be at least 1")]
    ZeroDepth,

    /// Interval of zero
    #[error("interval_ms must be greater than 0")]
    ZeroInterval,

    /// Interval beyond what timestamps can represent
    #[error("interval_ms {interval_ms} is too large")]
    IntervalTooLarge { interval_ms: u64 },

    /// Replay range that selects nothing
    #[error("replay range is empty: from {from} is not before to {to}")]
    EmptyReplayRange { from: Timestamp, to: Timestamp },

    /// `mode: "replay"` without a `replayRange`
    #[error("replay mode requires replayRange")]
    MissingReplayRange,

    /// `replayRange` given alongside a mode other than a bare "replay"
    #[error("replayRange is only valid with mode \"replay\"")]
    UnexpectedReplayRange,

    /// Sink channel without room for a single record
    #[error("channel_capacity must be at least 1")]
    ZeroChannelCapacity,

    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for this schema
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Half-open `[from, to)` window of exchange timestamps for replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplayRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl ReplayRange {
    /// Create a new range
    pub fn new(from: Timestamp, to: Timestamp) -> Self {
        Self { from, to }
    }

    /// True if `ts` falls inside the window
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.from <= ts && ts < self.to
    }

    /// True once `ts` has reached the end of the window
    pub fn is_past(&self, ts: Timestamp) -> bool {
        ts >= self.to
    }
}

/// Delivery mode of the delta source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Open-ended real-time stream
    #[default]
    Live,
    /// Historical stream bounded by a range
    Replay(ReplayRange),
}

impl Mode {
    /// The source mode this config expects
    pub fn source_mode(&self) -> SourceMode {
        match self {
            Self::Live => SourceMode::Live,
            Self::Replay(_) => SourceMode::Replay,
        }
    }

    /// The replay window, if any
    pub fn replay_range(&self) -> Option<ReplayRange> {
        match self {
            Self::Live => None,
            Self::Replay(range) => Some(*range),
        }
    }
}

fn default_depth() -> usize {
    10
}

fn default_interval_ms() -> u64 {
    60_000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_channel_capacity() -> usize {
    1024
}

/// Configuration for recording one instrument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Exchange identifier
    pub exchange: String,

    /// Symbol on the exchange
    pub symbol: String,

    /// Levels reported per side
    #[serde(default = "default_depth")]
    pub depth: usize,

    /// Sampling interval in milliseconds
    #[serde(default = "default_interval_ms", alias = "intervalMillis")]
    pub interval_ms: u64,

    /// Live or replay delivery
    #[serde(default)]
    pub mode: Mode,

    /// First boundary anchoring
    #[serde(default)]
    pub alignment: Alignment,

    /// Multi-boundary gap handling
    #[serde(default)]
    pub gap_policy: GapPolicy,

    /// Record timestamp source
    #[serde(default)]
    pub stamp: Stamp,

    /// Directory the CSV output is written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Records buffered between the sampler and the sink
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl RecorderConfig {
    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut value: Value = serde_json::from_str(json)?;
        fold_replay_range(&mut value)?;
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exchange.trim().is_empty() {
            return Err(ConfigError::EmptyExchange);
        }
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        // The sampler counts boundaries in microseconds
        if self.interval_ms > i64::MAX as u64 / 1_000 {
            return Err(ConfigError::IntervalTooLarge {
                interval_ms: self.interval_ms,
            });
        }
        if let Mode::Replay(range) = self.mode {
            if range.from >= range.to {
                return Err(ConfigError::EmptyReplayRange {
                    from: range.from,
                    to: range.to,
                });
            }
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }
        Ok(())
    }

    /// The tracked instrument
    pub fn instrument(&self) -> Instrument {
        Instrument::new(self.exchange.clone(), self.symbol.clone())
    }

    /// Sampling interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::milliseconds(self.interval_ms as i64)
    }

    /// Sampler parameters derived from this config
    pub fn sampler_config(&self) -> Result<SamplerConfig, ConfigError> {
        self.validate()?;
        let config = SamplerConfig::new(self.depth, self.interval()).map_err(|_| {
            ConfigError::IntervalTooLarge {
                interval_ms: self.interval_ms,
            }
        })?;
        Ok(config
            .with_alignment(self.alignment)
            .with_gap_policy(self.gap_policy)
            .with_stamp(self.stamp))
    }

    /// `{output_dir}/{exchange}_{symbol}_book_snapshot_{depth}_{interval_ms}ms.csv`
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!(
            "{}_book_snapshot_{}_{}ms.csv",
            self.instrument().file_stem(),
            self.depth,
            self.interval_ms
        ))
    }
}

/// Rewrite `"mode": "replay"` plus a sibling `replayRange` into the tagged form
fn fold_replay_range(value: &mut Value) -> Result<(), ConfigError> {
    let Some(object) = value.as_object_mut() else {
        return Ok(());
    };
    let range = match object.remove("replayRange") {
        Some(range) => Some(range),
        None => object.remove("replay_range"),
    };
    let bare_replay = object.get("mode").and_then(Value::as_str) == Some("replay");

    match (bare_replay, range) {
        (true, Some(range)) => {
            object.insert("mode".to_owned(), json!({ "replay": range }));
            Ok(())
        }
        (true, None) => Err(ConfigError::MissingReplayRange),
        (false, Some(_)) => Err(ConfigError::UnexpectedReplayRange),
        (false, None) => Ok(()),
    }
}

/// Builder for a [`RecorderConfig`]
#[derive(Debug, Clone)]
pub struct RecorderBuilder {
    config: RecorderConfig,
}

impl RecorderBuilder {
    /// Start a live config for one instrument with default depth and interval
    pub fn new(exchange: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            config: RecorderConfig {
                exchange: exchange.into(),
                symbol: symbol.into(),
                depth: default_depth(),
                interval_ms: default_interval_ms(),
                mode: Mode::Live,
                alignment: Alignment::default(),
                gap_policy: GapPolicy::default(),
                stamp: Stamp::default(),
                output_dir: default_output_dir(),
                channel_capacity: default_channel_capacity(),
            },
        }
    }

    /// Set the number of levels per side
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.config.depth = depth;
        self
    }

    /// Set the sampling interval
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.interval_ms = interval_ms;
        self
    }

    /// Record from an open-ended live stream
    pub fn live(mut self) -> Self {
        self.config.mode = Mode::Live;
        self
    }

    /// Record from a historical stream bounded by `[from, to)`
    pub fn replay(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.config.mode = Mode::Replay(ReplayRange::new(from, to));
        self
    }

    /// Set first boundary anchoring
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.config.alignment = alignment;
        self
    }

    /// Set multi-boundary gap handling
    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.config.gap_policy = gap_policy;
        self
    }

    /// Set record timestamp source
    pub fn with_stamp(mut self, stamp: Stamp) -> Self {
        self.config.stamp = stamp;
        self
    }

    /// Set the CSV output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Set how many records may queue for the sink
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<RecorderConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn ts(ms: i64) -> Timestamp {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let config = RecorderBuilder::new("binance-futures", "BTCUSDT")
            .build()
            .unwrap();

        assert_eq!(config.depth, 10);
        assert_eq!(config.interval_ms, 60_000);
        assert_eq!(config.mode, Mode::Live);
        assert_eq!(config.mode.source_mode(), SourceMode::Live);
        assert_eq!(config.gap_policy, GapPolicy::ForwardFill);
        assert_eq!(config.instrument().to_string(), "binance-futures:BTCUSDT");
    }

    #[test]
    fn test_builder_fluent_api() {
        let config = RecorderBuilder::new("bybit", "ETH/USDT")
            .with_depth(1)
            .with_interval_ms(250)
            .replay(ts(0), ts(3_600_000))
            .with_alignment(Alignment::FirstEvent)
            .with_gap_policy(GapPolicy::LatestOnly)
            .with_stamp(Stamp::Trigger)
            .with_output_dir("/tmp/out")
            .with_channel_capacity(8)
            .build()
            .unwrap();

        assert_eq!(config.mode.replay_range(), Some(ReplayRange::new(ts(0), ts(3_600_000))));
        assert_eq!(
            config.output_path(),
            PathBuf::from("/tmp/out/bybit_ETH-USDT_book_snapshot_1_250ms.csv")
        );

        let sampler = config.sampler_config().unwrap();
        assert_eq!(sampler.depth(), 1);
        assert_eq!(sampler.interval(), Duration::milliseconds(250));
        assert_eq!(sampler.alignment(), Alignment::FirstEvent);
        assert_eq!(sampler.gap_policy(), GapPolicy::LatestOnly);
        assert_eq!(sampler.stamp(), Stamp::Trigger);
    }

    #[test]
    fn test_validation_errors() {
        let err = RecorderBuilder::new("", "BTCUSDT").build().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyExchange));

        let err = RecorderBuilder::new("bybit", " ").build().unwrap_err();
        assert!(matches!(err, ConfigError::EmptySymbol));

        let err = RecorderBuilder::new("bybit", "BTCUSDT")
            .with_depth(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroDepth));

        let err = RecorderBuilder::new("bybit", "BTCUSDT")
            .with_interval_ms(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroInterval));

        let err = RecorderBuilder::new("bybit", "BTCUSDT")
            .with_interval_ms(u64::MAX)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::IntervalTooLarge { .. }));

        let err = RecorderBuilder::new("bybit", "BTCUSDT")
            .replay(ts(10), ts(10))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyReplayRange { .. }));

        let err = RecorderBuilder::new("bybit", "BTCUSDT")
            .with_channel_capacity(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroChannelCapacity));
    }

    #[test]
    fn test_from_json_live() {
        let config = RecorderConfig::from_json_str(
            r#"{"exchange": "bybit", "symbol": "BTCUSDT", "depth": 1, "intervalMillis": 60000, "mode": "live"}"#,
        )
        .unwrap();

        assert_eq!(config.depth, 1);
        assert_eq!(config.interval_ms, 60_000);
        assert_eq!(config.mode, Mode::Live);
        assert_eq!(config.output_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_from_json_replay() {
        let config = RecorderConfig::from_json_str(
            r#"{
                "exchange": "binance-futures",
                "symbol": "ETHUSDT",
                "interval_ms": 1000,
                "mode": {"replay": {"from": "2024-03-01T00:00:00Z", "to": "2024-03-02T00:00:00Z"}},
                "gap_policy": "latest_only"
            }"#,
        )
        .unwrap();

        let range = config.mode.replay_range().unwrap();
        assert_eq!(range.to - range.from, Duration::days(1));
        assert_eq!(config.gap_policy, GapPolicy::LatestOnly);
        assert_eq!(config.depth, 10);
    }

    #[test]
    fn test_from_json_flat_replay_range() {
        let config = RecorderConfig::from_json_str(
            r#"{
                "exchange": "bybit",
                "symbol": "BTCUSDT",
                "mode": "replay",
                "replayRange": {"from": "2024-03-01T00:00:00Z", "to": "2024-03-01T06:00:00Z"}
            }"#,
        )
        .unwrap();

        let range = config.mode.replay_range().unwrap();
        assert_eq!(range.to - range.from, Duration::hours(6));
        assert_eq!(config.mode.source_mode(), SourceMode::Replay);

        let snake = RecorderConfig::from_json_str(
            r#"{"exchange": "bybit", "symbol": "BTCUSDT", "mode": "replay",
                "replay_range": {"from": "2024-03-01T00:00:00Z", "to": "2024-03-01T06:00:00Z"}}"#,
        )
        .unwrap();
        assert_eq!(snake, config);
    }

    #[test]
    fn test_from_json_replay_range_mismatch() {
        let err = RecorderConfig::from_json_str(
            r#"{"exchange": "bybit", "symbol": "BTCUSDT", "mode": "replay"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingReplayRange));

        let err = RecorderConfig::from_json_str(
            r#"{"exchange": "bybit", "symbol": "BTCUSDT", "mode": "live",
                "replayRange": {"from": "2024-03-01T00:00:00Z", "to": "2024-03-02T00:00:00Z"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnexpectedReplayRange));

        let err = RecorderConfig::from_json_str(
            r#"{"exchange": "bybit", "symbol": "BTCUSDT", "mode": "replay",
                "replayRange": {"from": "2024-03-02T00:00:00Z", "to": "2024-03-01T00:00:00Z"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyReplayRange { .. }));
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let err = RecorderConfig::from_json_str(r#"{"exchange": "bybit"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));

        let err = RecorderConfig::from_json_str(r#"{"exchange": "bybit", "symbol": "X", "depth": 0}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroDepth));
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = RecorderConfig::from_json_file("/nonexistent/depthtape.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_replay_range() {
        let range = ReplayRange::new(ts(100), ts(200));
        assert!(!range.contains(ts(99)));
        assert!(range.contains(ts(100)));
        assert!(range.contains(ts(199)));
        assert!(!range.contains(ts(200)));
        assert!(range.is_past(ts(200)));
        assert!(!range.is_past(ts(199)));
    }
}
