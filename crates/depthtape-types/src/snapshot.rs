//! Fixed-depth snapshot records

use crate::{
    level::{BookLevel, LevelPair},
    Timestamp,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable point-in-time sample of the best `depth` levels on each side
///
/// `levels` always has exactly `depth` entries; positions the book could not
/// fill hold `None` rather than a placeholder price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    /// Sample instant (boundary or triggering exchange time, per [`crate::Stamp`])
    pub timestamp: Timestamp,
    /// Local receipt time of the delta that triggered the sample
    pub local_timestamp: Timestamp,
    /// Best-first level pairs, index 0 is top-of-book
    pub levels: Vec<LevelPair>,
}

impl SnapshotRecord {
    /// Build a record by zipping best-first bid and ask levels, padding both
    /// sides with `None` up to `depth`
    pub fn from_sides(
        timestamp: Timestamp,
        local_timestamp: Timestamp,
        bids: &[BookLevel],
        asks: &[BookLevel],
        depth: usize,
    ) -> Self {
        let levels = (0..depth)
            .map(|i| LevelPair::new(bids.get(i).copied(), asks.get(i).copied()))
            .collect();

        Self {
            timestamp,
            local_timestamp,
            levels,
        }
    }

    /// Number of level positions in this record
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Best bid level
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.levels.first().and_then(|l| l.bid.as_ref())
    }

    /// Best ask level
    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.levels.first().and_then(|l| l.ask.as_ref())
    }

    /// Present bid levels, best first
    pub fn bids(&self) -> impl Iterator<Item = &BookLevel> {
        self.levels.iter().filter_map(|l| l.bid.as_ref())
    }

    /// Present ask levels, best first
    pub fn asks(&self) -> impl Iterator<Item = &BookLevel> {
        self.levels.iter().filter_map(|l| l.ask.as_ref())
    }

    /// Get the spread (ask - bid)
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Get the mid price ((ask + bid) / 2)
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some((ask.price + bid.price) / Decimal::TWO),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn ts(ms: i64) -> Timestamp {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_from_sides_pads_missing_levels() {
        let bids = [BookLevel::new(dec!(100), dec!(5))];
        let asks = [
            BookLevel::new(dec!(101), dec!(3)),
            BookLevel::new(dec!(102), dec!(4)),
        ];

        let record = SnapshotRecord::from_sides(ts(0), ts(1), &bids, &asks, 3);

        assert_eq!(record.depth(), 3);
        assert_eq!(record.levels[0].bid, Some(bids[0]));
        assert_eq!(record.levels[1].bid, None);
        assert_eq!(record.levels[1].ask, Some(asks[1]));
        assert!(record.levels[2].is_empty());
        assert_eq!(record.bids().count(), 1);
        assert_eq!(record.asks().count(), 2);
    }

    #[test]
    fn test_spread_and_mid() {
        let record = SnapshotRecord::from_sides(
            ts(0),
            ts(0),
            &[BookLevel::new(dec!(100), dec!(1))],
            &[BookLevel::new(dec!(102), dec!(1))],
            1,
        );

        assert_eq!(record.spread(), Some(dec!(2)));
        assert_eq!(record.mid_price(), Some(dec!(101)));
    }

    #[test]
    fn test_one_sided_book_has_no_spread() {
        let record = SnapshotRecord::from_sides(
            ts(0),
            ts(0),
            &[],
            &[BookLevel::new(dec!(102), dec!(1))],
            1,
        );

        assert!(record.best_bid().is_none());
        assert_eq!(record.spread(), None);
        assert_eq!(record.mid_price(), None);
    }
}
