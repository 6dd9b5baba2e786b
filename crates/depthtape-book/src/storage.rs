//! BTreeMap-based book state
//!
//! Provides O(log N) level updates and best-first iteration on both sides.
//! Uses `Reverse<Decimal>` for bids to maintain descending order.

use depthtape_types::{BookDelta, BookLevel, Side};
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Current best-known price ladder for one instrument
///
/// - Bids: Stored with `Reverse<Decimal>` key for descending order (highest first)
/// - Asks: Stored with `Decimal` key for ascending order (lowest first)
///
/// Keys are prices, so each side holds at most one level per price.
#[derive(Debug, Clone, Default)]
pub struct BookState {
    /// Bids: highest price first (use Reverse for descending order)
    bids: BTreeMap<Reverse<Decimal>, Decimal>,
    /// Asks: lowest price first (natural ascending order)
    asks: BTreeMap<Decimal, Decimal>,
}

impl BookState {
    /// Create a new empty book
    pub fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Apply a delta in place
    ///
    /// Zero size removes the level (no-op if absent); anything else inserts or
    /// replaces it. Input is trusted: sources reject malformed deltas before
    /// they get here.
    pub fn apply_delta(&mut self, delta: &BookDelta) {
        debug_assert!(
            !delta.size.is_sign_negative() || delta.size.is_zero(),
            "negative size {} reached the book",
            delta.size
        );
        self.set_level(delta.side, delta.price, delta.size);
    }

    /// Set the resting size at `price` on `side`; zero removes the level
    pub fn set_level(&mut self, side: Side, price: Decimal, size: Decimal) {
        match (side, size.is_zero()) {
            (Side::Bid, true) => {
                self.bids.remove(&Reverse(price));
            }
            (Side::Bid, false) => {
                self.bids.insert(Reverse(price), size);
            }
            (Side::Ask, true) => {
                self.asks.remove(&price);
            }
            (Side::Ask, false) => {
                self.asks.insert(price, size);
            }
        }
    }

    /// Best `depth` levels on `side`, best first
    ///
    /// Returns fewer than `depth` levels when the side is shallower; never pads.
    pub fn top_levels(&self, side: Side, depth: usize) -> Vec<BookLevel> {
        match side {
            Side::Bid => self
                .bids
                .iter()
                .take(depth)
                .map(|(Reverse(price), amount)| BookLevel::new(*price, *amount))
                .collect(),
            Side::Ask => self
                .asks
                .iter()
                .take(depth)
                .map(|(price, amount)| BookLevel::new(*price, *amount))
                .collect(),
        }
    }

    /// Get the best bid (highest price)
    pub fn best_bid(&self) -> Option<BookLevel> {
        self.bids
            .iter()
            .next()
            .map(|(Reverse(price), amount)| BookLevel::new(*price, *amount))
    }

    /// Get the best ask (lowest price)
    pub fn best_ask(&self) -> Option<BookLevel> {
        self.asks
            .iter()
            .next()
            .map(|(price, amount)| BookLevel::new(*price, *amount))
    }

    /// Resting size at an exact price
    pub fn amount_at(&self, side: Side, price: Decimal) -> Option<Decimal> {
        match side {
            Side::Bid => self.bids.get(&Reverse(price)).copied(),
            Side::Ask => self.asks.get(&price).copied(),
        }
    }

    /// Number of bid levels
    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    /// Number of ask levels
    pub fn ask_count(&self) -> usize {
        self.asks.len()
    }

    /// Check if the book is empty
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Clear all levels
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use depthtape_types::Timestamp;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn t0() -> Timestamp {
        DateTime::from_timestamp_millis(0).unwrap()
    }

    #[test]
    fn test_bid_order() {
        let mut book = BookState::new();
        book.set_level(Side::Bid, dec!(100), dec!(1));
        book.set_level(Side::Bid, dec!(101), dec!(2));
        book.set_level(Side::Bid, dec!(99), dec!(3));

        let bids = book.top_levels(Side::Bid, 10);
        assert_eq!(bids.len(), 3);
        // Should be in descending order
        assert_eq!(bids[0].price, dec!(101));
        assert_eq!(bids[1].price, dec!(100));
        assert_eq!(bids[2].price, dec!(99));
    }

    #[test]
    fn test_ask_order() {
        let mut book = BookState::new();
        book.set_level(Side::Ask, dec!(100), dec!(1));
        book.set_level(Side::Ask, dec!(101), dec!(2));
        book.set_level(Side::Ask, dec!(99), dec!(3));

        let asks = book.top_levels(Side::Ask, 10);
        assert_eq!(asks.len(), 3);
        // Should be in ascending order
        assert_eq!(asks[0].price, dec!(99));
        assert_eq!(asks[1].price, dec!(100));
        assert_eq!(asks[2].price, dec!(101));
    }

    #[test]
    fn test_zero_size_removes_level() {
        let mut book = BookState::new();
        book.apply_delta(&BookDelta::bid(t0(), dec!(100), dec!(1)));
        assert_eq!(book.bid_count(), 1);

        book.apply_delta(&BookDelta::bid(t0(), dec!(100), dec!(0)));
        assert_eq!(book.bid_count(), 0);
        assert!(book.best_bid().is_none());
    }

    #[test]
    fn test_removing_absent_level_is_noop() {
        let mut book = BookState::new();
        book.apply_delta(&BookDelta::ask(t0(), dec!(101), dec!(3)));

        book.apply_delta(&BookDelta::ask(t0(), dec!(105), dec!(0)));
        book.apply_delta(&BookDelta::bid(t0(), dec!(101), dec!(0)));

        assert_eq!(book.ask_count(), 1);
        assert_eq!(book.bid_count(), 0);
        assert_eq!(book.amount_at(Side::Ask, dec!(101)), Some(dec!(3)));
    }

    #[test]
    fn test_update_replaces_amount() {
        let mut book = BookState::new();
        book.apply_delta(&BookDelta::bid(t0(), dec!(100), dec!(5)));
        book.apply_delta(&BookDelta::bid(t0(), dec!(100), dec!(7)));

        assert_eq!(book.bid_count(), 1);
        assert_eq!(book.best_bid(), Some(BookLevel::new(dec!(100), dec!(7))));
    }

    #[test]
    fn test_prices_equal_across_scale_share_a_level() {
        let mut book = BookState::new();
        book.set_level(Side::Bid, dec!(100), dec!(5));
        book.set_level(Side::Bid, dec!(100.00), dec!(7));

        assert_eq!(book.bid_count(), 1);
        assert_eq!(book.amount_at(Side::Bid, dec!(100.0)), Some(dec!(7)));
    }

    #[test]
    fn test_top_levels_limits_depth() {
        let mut book = BookState::new();
        for i in 1..=20 {
            book.set_level(Side::Bid, Decimal::from(i), dec!(1));
            book.set_level(Side::Ask, Decimal::from(100 + i), dec!(1));
        }

        let bids = book.top_levels(Side::Bid, 5);
        let asks = book.top_levels(Side::Ask, 5);
        assert_eq!(bids.len(), 5);
        assert_eq!(asks.len(), 5);

        // Best bid should be 20 (highest)
        assert_eq!(bids[0].price, dec!(20));
        // Best ask should be 101 (lowest)
        assert_eq!(asks[0].price, dec!(101));

        assert!(book.top_levels(Side::Bid, 0).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut book = BookState::new();
        book.set_level(Side::Bid, dec!(100), dec!(1));
        book.set_level(Side::Ask, dec!(101), dec!(1));
        assert!(!book.is_empty());

        book.clear();
        assert!(book.is_empty());
    }

    fn arb_delta() -> impl Strategy<Value = (bool, u32, u32)> {
        // (is_bid, price ticks, size) with size 0 roughly a quarter of the time
        (any::<bool>(), 1u32..50, prop_oneof![Just(0u32), 1u32..1000])
    }

    proptest! {
        #[test]
        fn prop_top_levels_sorted_unique_and_bounded(
            deltas in proptest::collection::vec(arb_delta(), 0..200),
            depth in 0usize..12,
        ) {
            let mut book = BookState::new();
            for (is_bid, price, size) in deltas {
                let side = if is_bid { Side::Bid } else { Side::Ask };
                book.apply_delta(&BookDelta::new(
                    t0(),
                    t0(),
                    side,
                    Decimal::from(price),
                    Decimal::from(size),
                ));
            }

            let bids = book.top_levels(Side::Bid, depth);
            let asks = book.top_levels(Side::Ask, depth);

            prop_assert!(bids.len() <= depth);
            prop_assert!(asks.len() <= depth);
            prop_assert!(bids.windows(2).all(|w| w[0].price > w[1].price));
            prop_assert!(asks.windows(2).all(|w| w[0].price < w[1].price));
            prop_assert!(bids.iter().chain(asks.iter()).all(|l| !l.amount.is_zero()));
        }

        #[test]
        fn prop_latest_size_wins(sizes in proptest::collection::vec(1u32..1000, 1..20)) {
            let mut book = BookState::new();
            for size in &sizes {
                book.apply_delta(&BookDelta::bid(t0(), dec!(100), Decimal::from(*size)));
            }

            let last = Decimal::from(*sizes.last().unwrap());
            prop_assert_eq!(book.bid_count(), 1);
            prop_assert_eq!(book.amount_at(Side::Bid, dec!(100)), Some(last));
        }
    }
}
