//! Tabular snapshot encoding
//!
//! Column layout for depth N:
//!
//! ```text
//! timestamp,localTimestamp,bid_price_0,bid_amount_0,ask_price_0,ask_amount_0,...,ask_amount_{N-1}
//! ```
//!
//! Timestamps are RFC 3339 UTC with microsecond precision. Absent levels are
//! empty fields. Every field is a timestamp or a decimal, so nothing needs
//! quoting.

use chrono::SecondsFormat;
use depthtape_types::{BookLevel, SnapshotRecord, Timestamp};
use std::fmt::Write;

/// Header line (newline-terminated) for `depth` levels
pub fn header(depth: usize) -> String {
    let mut line = String::from("timestamp,localTimestamp");
    for i in 0..depth {
        // Writing to a String cannot fail
        let _ = write!(
            line,
            ",bid_price_{i},bid_amount_{i},ask_price_{i},ask_amount_{i}"
        );
    }
    line.push('\n');
    line
}

/// Data line (newline-terminated) for one record
pub fn row(record: &SnapshotRecord) -> String {
    let mut line = String::with_capacity(48 + record.depth() * 48);
    line.push_str(&format_timestamp(record.timestamp));
    line.push(',');
    line.push_str(&format_timestamp(record.local_timestamp));

    for pair in &record.levels {
        push_level(&mut line, pair.bid.as_ref());
        push_level(&mut line, pair.ask.as_ref());
    }

    line.push('\n');
    line
}

/// RFC 3339 in UTC with a `Z` suffix and six fractional digits
pub fn format_timestamp(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn push_level(line: &mut String, level: Option<&BookLevel>) {
    match level {
        Some(level) => {
            let _ = write!(
                line,
                ",{},{}",
                level.price.normalize(),
                level.amount.normalize()
            );
        }
        None => line.push_str(",,"),
    }
}
