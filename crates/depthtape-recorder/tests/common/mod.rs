//! Common fixtures for recorder integration tests
//!
//! Timestamps are milliseconds since the Unix epoch so expected CSV rows stay
//! readable.

#![allow(dead_code)]

use chrono::DateTime;
use depthtape_recorder::prelude::*;
use rust_decimal_macros::dec;
use std::path::Path;
use std::sync::Arc;

/// One minute, the default sampling interval
pub const MINUTE: i64 = 60_000;

pub const HEADER_DEPTH_1: &str =
    "timestamp,localTimestamp,bid_price_0,bid_amount_0,ask_price_0,ask_amount_0";

pub fn ts(ms: i64) -> Timestamp {
    DateTime::from_timestamp_millis(ms).unwrap()
}

/// Replay config for a test instrument covering the first day after the epoch
pub fn replay_config(depth: usize, interval_ms: u64, output_dir: &Path) -> RecorderConfig {
    RecorderBuilder::new("testex", "BTC/USDT")
        .with_depth(depth)
        .with_interval_ms(interval_ms)
        .replay(ts(0), ts(24 * 60 * MINUTE))
        .with_output_dir(output_dir)
        .build()
        .unwrap()
}

/// Live config for `symbol`
pub fn live_config(symbol: &str, output_dir: &Path) -> RecorderConfig {
    RecorderBuilder::new("testex", symbol)
        .with_depth(1)
        .with_interval_ms(MINUTE as u64)
        .live()
        .with_output_dir(output_dir)
        .build()
        .unwrap()
}

/// Bid 100 x 5 and ask 101 x 3 at t=0, then an ask behind the top at t=60000
pub fn scenario_a() -> Vec<BookDelta> {
    vec![
        BookDelta::bid(ts(0), dec!(100), dec!(5)),
        BookDelta::ask(ts(0), dec!(101), dec!(3)),
        BookDelta::ask(ts(MINUTE), dec!(102), dec!(1)),
    ]
}

/// The only bid is removed before the first boundary
pub fn scenario_b() -> Vec<BookDelta> {
    vec![
        BookDelta::bid(ts(0), dec!(100), dec!(5)),
        BookDelta::ask(ts(10), dec!(101), dec!(3)),
        BookDelta::bid(ts(20), dec!(100), dec!(0)),
        BookDelta::ask(ts(MINUTE), dec!(102), dec!(1)),
    ]
}

/// Two updates at the same bid price before the boundary
pub fn scenario_c() -> Vec<BookDelta> {
    vec![
        BookDelta::bid(ts(0), dec!(100), dec!(5)),
        BookDelta::bid(ts(1_000), dec!(100), dec!(7)),
        BookDelta::ask(ts(2_000), dec!(101), dec!(3)),
        BookDelta::ask(ts(MINUTE), dec!(102), dec!(1)),
    ]
}

/// Three interval boundaries pass between the last two deltas
pub fn scenario_d() -> Vec<BookDelta> {
    vec![
        BookDelta::bid(ts(0), dec!(100), dec!(5)),
        BookDelta::ask(ts(MINUTE / 2), dec!(101), dec!(3)),
        BookDelta::ask(ts(MINUTE / 2 + 3 * MINUTE), dec!(102), dec!(1)),
    ]
}

/// A steadily moving book over `minutes` minutes, one delta every 7 seconds
pub fn trending_book(minutes: i64) -> Vec<BookDelta> {
    (0..minutes * 60 / 7)
        .map(|i| {
            let at = ts(i * 7_000);
            let offset = rust_decimal::Decimal::from(i % 20);
            if i % 2 == 0 {
                BookDelta::bid(at, dec!(1000) + offset, dec!(0.5) * offset)
            } else {
                BookDelta::ask(at, dec!(1021) + offset, dec!(0.25) + offset)
            }
        })
        .collect()
}

/// Write deltas as JSON lines
pub fn write_jsonl(path: &Path, deltas: &[BookDelta]) {
    let body: String = deltas
        .iter()
        .map(|d| serde_json::to_string(d).unwrap() + "\n")
        .collect();
    std::fs::write(path, body).unwrap();
}

/// Replay `deltas` into a CSV file at the config's output path
pub async fn record_to_csv(
    config: RecorderConfig,
    deltas: Vec<BookDelta>,
) -> (RunSummary, Arc<MemoryDiagnostics>) {
    let diagnostics = Arc::new(MemoryDiagnostics::new());
    let sink = CsvSink::open(config.output_path(), config.depth).await.unwrap();
    let recorder =
        Recorder::new(config, ReplaySource::new(deltas), sink, diagnostics.clone()).unwrap();
    let summary = recorder.run().await.unwrap();
    (summary, diagnostics)
}

/// Data rows of a CSV file, header stripped
pub fn data_rows(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}
