//! Recorder error type

use crate::config::ConfigError;
use depthtape_types::{SourceError, Timestamp};
use thiserror::Error;

/// Errors that end a recorder run
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Configuration rejected before the run started
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The source failed fatally
    ///
    /// `resume_from` is the timestamp of the last snapshot the sink persisted,
    /// the point a restarted run can replay from.
    #[error("source failed: {source}")]
    Source {
        #[source]
        source: SourceError,
        resume_from: Option<Timestamp>,
    },

    /// The sink worker stopped accepting records
    #[error("snapshot sink closed unexpectedly")]
    SinkClosed,
}

impl RecorderError {
    /// Returns true if restarting the run can succeed without a config change
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Source { source, .. } => matches!(
                source,
                SourceError::Io(_) | SourceError::Disconnected(_)
            ),
            Self::Config(_) | Self::SinkClosed => false,
        }
    }

    /// Where a restarted replay should begin, if known
    pub fn resume_from(&self) -> Option<Timestamp> {
        match self {
            Self::Source { resume_from, .. } => *resume_from,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_source_error_is_retryable() {
        let at = DateTime::from_timestamp_millis(120_000);
        let err = RecorderError::Source {
            source: SourceError::Disconnected("reset by peer".into()),
            resume_from: at,
        };
        assert!(err.is_retryable());
        assert_eq!(err.resume_from(), at);
        assert_eq!(err.to_string(), "source failed: source disconnected: reset by peer");
    }

    #[test]
    fn test_config_error_not_retryable() {
        let err = RecorderError::from(ConfigError::ZeroDepth);
        assert!(!err.is_retryable());
        assert_eq!(err.resume_from(), None);
        assert!(!RecorderError::SinkClosed.is_retryable());
    }
}
