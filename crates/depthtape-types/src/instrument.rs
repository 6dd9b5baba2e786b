//! Tracked instrument identity (exchange:symbol)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One tracked book: an exchange plus a symbol on that exchange
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    /// Exchange identifier (e.g., "binance-futures")
    pub exchange: String,
    /// Symbol as the exchange names it (e.g., "BTCUSDT", "BTC/USD")
    pub symbol: String,
}

impl Instrument {
    /// Create a new instrument
    pub fn new(exchange: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
        }
    }

    /// Filesystem-safe `exchange_symbol` stem for output files
    ///
    /// Path separators and colons in either part become `-`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", sanitize(&self.exchange), sanitize(&self.symbol))
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c if c.is_whitespace() => '-',
            c => c,
        })
        .collect()
}

impl FromStr for Instrument {
    type Err = InstrumentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (exchange, symbol) = s
            .split_once(':')
            .ok_or_else(|| InstrumentParseError::MissingColon(s.to_string()))?;

        if exchange.is_empty() || symbol.is_empty() {
            return Err(InstrumentParseError::EmptyPart(s.to_string()));
        }

        Ok(Self::new(exchange, symbol))
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.symbol)
    }
}

/// Error parsing an instrument
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstrumentParseError {
    #[error("Instrument must be written as exchange:symbol: {0}")]
    MissingColon(String),

    #[error("Instrument has empty exchange or symbol: {0}")]
    EmptyPart(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_parse() {
        let instrument: Instrument = "bybit:BTC/USDT".parse().unwrap();
        assert_eq!(instrument.exchange, "bybit");
        assert_eq!(instrument.symbol, "BTC/USDT");
        assert_eq!(instrument.to_string(), "bybit:BTC/USDT");
    }

    #[test]
    fn test_instrument_parse_error() {
        assert!("bybit".parse::<Instrument>().is_err());
        assert!(":BTCUSDT".parse::<Instrument>().is_err());
        assert!("bybit:".parse::<Instrument>().is_err());
    }

    #[test]
    fn test_file_stem() {
        let instrument = Instrument::new("binance-futures", "BTC/USDT:USDT");
        assert_eq!(instrument.file_stem(), "binance-futures_BTC-USDT-USDT");
    }
}
