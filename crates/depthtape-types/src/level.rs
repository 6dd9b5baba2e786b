//! Price level types with decimal precision

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// A single price level in the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookLevel {
    /// Price of this level
    #[serde(deserialize_with = "deserialize_decimal")]
    pub price: Decimal,
    /// Resting amount at this price
    #[serde(deserialize_with = "deserialize_decimal")]
    pub amount: Decimal,
}

impl BookLevel {
    /// Create a new price level
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }
}

/// Row position `i` of a snapshot: the i-th best bid and the i-th best ask
///
/// Either side is `None` when the book holds fewer than `i + 1` levels there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LevelPair {
    pub bid: Option<BookLevel>,
    pub ask: Option<BookLevel>,
}

impl LevelPair {
    /// Create a pair from optional levels
    pub fn new(bid: Option<BookLevel>, ask: Option<BookLevel>) -> Self {
        Self { bid, ask }
    }

    /// True when neither side has a level at this position
    pub fn is_empty(&self) -> bool {
        self.bid.is_none() && self.ask.is_none()
    }
}

/// Accepts decimals as JSON strings or numbers without going through f64
/// where avoidable
pub(crate) fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    use rust_decimal::prelude::FromPrimitive;
    use serde::de::Error;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => Decimal::from_str(s.trim()).map_err(D::Error::custom),
        StringOrNumber::Number(n) => {
            let s = n.to_string();
            // Scientific notation (5e-6) has no direct decimal parse
            if s.contains('e') || s.contains('E') {
                let f = n.as_f64().ok_or_else(|| D::Error::custom("invalid number"))?;
                Decimal::from_f64(f).ok_or_else(|| D::Error::custom("cannot convert to decimal"))
            } else {
                Decimal::from_str(&s).map_err(D::Error::custom)
            }
        }
    }
}
