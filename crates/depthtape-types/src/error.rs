//! Error types for sources, sinks and delta validation

use rust_decimal::Decimal;
use thiserror::Error;

/// A delta that violates the input contract of the book
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeltaError {
    /// Price below zero
    #[error("negative price {price}")]
    NegativePrice { price: Decimal },

    /// Price of exactly zero
    #[error("zero price")]
    ZeroPrice,

    /// Size below zero
    #[error("negative size {size} at price {price}")]
    NegativeSize { price: Decimal, size: Decimal },
}

/// Errors raised by a delta source
///
/// End-of-stream is not an error: sources report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum SourceError {
    // === Recoverable ===
    /// A single event could not be decoded or failed validation
    #[error("malformed delta at line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    // === Fatal ===
    /// Reading from the underlying stream failed
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The provider connection dropped before end-of-stream
    #[error("source disconnected: {0}")]
    Disconnected(String),
}

impl SourceError {
    /// Create a malformed-event error
    pub fn malformed(line: u64, reason: impl ToString) -> Self {
        Self::Malformed {
            line,
            reason: reason.to_string(),
        }
    }

    /// Returns true if the source can keep delivering after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Errors raised by a snapshot sink
#[derive(Error, Debug)]
pub enum SinkError {
    /// Writing to the destination failed
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink refused the record
    #[error("sink rejected record: {0}")]
    Rejected(String),
}
