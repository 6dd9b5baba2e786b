//! Command-line arguments

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use depthtape_recorder::{Mode, RecorderBuilder, RecorderConfig, ReplayRange};
use depthtape_types::{Alignment, GapPolicy, Stamp};
use std::path::PathBuf;

/// Record fixed-interval order book snapshots to CSV
///
/// Reads JSON-lines book deltas from a file or stdin, samples the top N levels
/// of the book at every interval boundary and appends one CSV row per sample.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Exchange identifier
    #[arg(short, long)]
    pub exchange: Option<String>,

    /// Symbol on the exchange
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Levels per side
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Sampling interval in milliseconds
    #[arg(short, long)]
    pub interval_ms: Option<u64>,

    /// Replay start, inclusive (RFC3339, e.g. "2024-03-01T00:00:00Z")
    #[arg(long, value_parser = parse_timestamp, requires = "to")]
    pub from: Option<DateTime<Utc>>,

    /// Replay end, exclusive (RFC3339)
    #[arg(long, value_parser = parse_timestamp, requires = "from")]
    pub to: Option<DateTime<Utc>>,

    /// JSON-lines delta input; "-" reads stdin
    #[arg(long, default_value = "-")]
    pub input: String,

    /// Directory for the CSV output
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// How the first boundary is anchored
    #[arg(long, value_enum)]
    pub alignment: Option<AlignmentArg>,

    /// What to emit when several boundaries pass between deltas
    #[arg(long, value_enum)]
    pub gap_policy: Option<GapPolicyArg>,

    /// Which timestamp goes in the record's timestamp column
    #[arg(long, value_enum)]
    pub stamp: Option<StampArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlignmentArg {
    Epoch,
    FirstEvent,
}

impl From<AlignmentArg> for Alignment {
    fn from(arg: AlignmentArg) -> Self {
        match arg {
            AlignmentArg::Epoch => Alignment::Epoch,
            AlignmentArg::FirstEvent => Alignment::FirstEvent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GapPolicyArg {
    ForwardFill,
    LatestOnly,
}

impl From<GapPolicyArg> for GapPolicy {
    fn from(arg: GapPolicyArg) -> Self {
        match arg {
            GapPolicyArg::ForwardFill => GapPolicy::ForwardFill,
            GapPolicyArg::LatestOnly => GapPolicy::LatestOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StampArg {
    Boundary,
    Trigger,
}

impl From<StampArg> for Stamp {
    fn from(arg: StampArg) -> Self {
        match arg {
            StampArg::Boundary => Stamp::Boundary,
            StampArg::Trigger => Stamp::Trigger,
        }
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC3339 timestamp: {e}"))
}

impl Args {
    /// Merge the config file (if any) with flag overrides and validate
    pub fn recorder_config(&self) -> Result<RecorderConfig> {
        let mut config = match &self.config {
            Some(path) => RecorderConfig::from_json_file(path)?,
            None => {
                let (Some(exchange), Some(symbol)) = (&self.exchange, &self.symbol) else {
                    bail!("--exchange and --symbol are required without --config");
                };
                RecorderBuilder::new(exchange.as_str(), symbol.as_str()).build()?
            }
        };

        if let Some(exchange) = &self.exchange {
            config.exchange = exchange.clone();
        }
        if let Some(symbol) = &self.symbol {
            config.symbol = symbol.clone();
        }
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms;
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            config.mode = Mode::Replay(ReplayRange::new(from, to));
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(alignment) = self.alignment {
            config.alignment = alignment.into();
        }
        if let Some(gap_policy) = self.gap_policy {
            config.gap_policy = gap_policy.into();
        }
        if let Some(stamp) = self.stamp {
            config.stamp = stamp.into();
        }

        config.validate()?;
        Ok(config)
    }

    /// True if deltas come from standard input
    pub fn reads_stdin(&self) -> bool {
        self.input == "-"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("depthtape").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_only() {
        let args = parse(&["-e", "bybit", "-s", "BTCUSDT", "-d", "5", "-i", "1000"]);
        let config = args.recorder_config().unwrap();

        assert_eq!(config.exchange, "bybit");
        assert_eq!(config.depth, 5);
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.mode, Mode::Live);
        assert!(args.reads_stdin());
    }

    #[test]
    fn test_replay_range() {
        let args = parse(&[
            "--exchange",
            "bybit",
            "--symbol",
            "ETHUSDT",
            "--from",
            "2024-03-01T00:00:00Z",
            "--to",
            "2024-03-02T00:00:00+00:00",
            "--input",
            "deltas.jsonl",
        ]);
        let config = args.recorder_config().unwrap();

        let range = config.mode.replay_range().unwrap();
        assert_eq!(range.from.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(range.to.to_rfc3339(), "2024-03-02T00:00:00+00:00");
        assert!(!args.reads_stdin());
    }

    #[test]
    fn test_from_requires_to() {
        let result = Args::try_parse_from([
            "depthtape",
            "-e",
            "bybit",
            "-s",
            "BTCUSDT",
            "--from",
            "2024-03-01T00:00:00Z",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_timestamp() {
        let result = Args::try_parse_from(["depthtape", "--from", "yesterday", "--to", "now"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_instrument() {
        let args = parse(&["--depth", "5"]);
        assert!(args.recorder_config().is_err());
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let args = parse(&["-e", "bybit", "-s", "BTCUSDT", "-d", "0"]);
        assert!(args.recorder_config().is_err());

        let args = parse(&[
            "-e",
            "bybit",
            "-s",
            "BTCUSDT",
            "--from",
            "2024-03-02T00:00:00Z",
            "--to",
            "2024-03-01T00:00:00Z",
        ]);
        assert!(args.recorder_config().is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"exchange":"bybit","symbol":"BTCUSDT","depth":20,"interval_ms":5000,"gap_policy":"latest_only"}}"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let args = parse(&["--config", path, "--depth", "3", "--stamp", "trigger"]);
        let config = args.recorder_config().unwrap();

        assert_eq!(config.symbol, "BTCUSDT");
        assert_eq!(config.depth, 3);
        assert_eq!(config.interval_ms, 5000);
        assert_eq!(config.gap_policy, GapPolicy::LatestOnly);
        assert_eq!(config.stamp, Stamp::Trigger);
    }
}
