//! Normalized book delta events

use crate::{enums::Side, error::DeltaError, level::deserialize_decimal, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single price level change on one side of the book
///
/// A `size` of zero removes the level at `price`.
///
/// The JSON form uses camelCase keys and accepts decimals as strings or numbers:
///
/// ```
/// use depthtape_types::{BookDelta, Side};
///
/// let json = r#"{
///     "exchangeTimestamp": "2024-03-01T00:00:00.125Z",
///     "localTimestamp": "2024-03-01T00:00:00.131Z",
///     "side": "bid",
///     "price": "64250.5",
///     "size": 0.75
/// }"#;
/// let delta: BookDelta = serde_json::from_str(json).unwrap();
/// assert_eq!(delta.side, Side::Bid);
/// assert!(delta.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDelta {
    /// Time the exchange produced the change
    #[serde(alias = "exchange_timestamp", alias = "timestamp")]
    pub exchange_timestamp: Timestamp,
    /// Time the change was received locally
    #[serde(alias = "local_timestamp")]
    pub local_timestamp: Timestamp,
    /// Side of the book the change applies to
    pub side: Side,
    /// Price level being changed
    #[serde(deserialize_with = "deserialize_decimal")]
    pub price: Decimal,
    /// New resting size at `price` (0 = remove)
    #[serde(deserialize_with = "deserialize_decimal", alias = "amount")]
    pub size: Decimal,
}

impl BookDelta {
    /// Create a new delta
    pub fn new(
        exchange_timestamp: Timestamp,
        local_timestamp: Timestamp,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Self {
        Self {
            exchange_timestamp,
            local_timestamp,
            side,
            price,
            size,
        }
    }

    /// Bid-side delta received at the same instant it was produced
    pub fn bid(timestamp: Timestamp, price: Decimal, size: Decimal) -> Self {
        Self::new(timestamp, timestamp, Side::Bid, price, size)
    }

    /// Ask-side delta received at the same instant it was produced
    pub fn ask(timestamp: Timestamp, price: Decimal, size: Decimal) -> Self {
        Self::new(timestamp, timestamp, Side::Ask, price, size)
    }

    /// Override the local receipt timestamp
    pub fn with_local_timestamp(mut self, local_timestamp: Timestamp) -> Self {
        self.local_timestamp = local_timestamp;
        self
    }

    /// True if this delta removes its price level
    pub fn is_removal(&self) -> bool {
        self.size.is_zero()
    }

    /// Check the input contract the book relies on
    ///
    /// Sources call this before handing a delta to the sampler; the book
    /// itself trusts its input.
    pub fn validate(&self) -> Result<(), DeltaError> {
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(DeltaError::NegativePrice { price: self.price });
        }
        if self.price.is_zero() {
            return Err(DeltaError::ZeroPrice);
        }
        if self.size.is_sign_negative() && !self.size.is_zero() {
            return Err(DeltaError::NegativeSize {
                price: self.price,
                size: self.size,
            });
        }
        Ok(())
    }
}
