//! Error types for move operations.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Convenience alias used across the shift crates.
pub type ShiftResult<T> = Result<T, ShiftError>;

/// Errors that can occur while moving content.
#[derive(Debug, Error)]
pub enum ShiftError {
    /// The platform answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// No response was received (connection reset, DNS, timeout).
    #[error("Network error: {message}")]
    Network { message: String },

    /// A retried operation kept failing.
    #[error("Gave up after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<ShiftError>,
    },

    /// A copy job reported a fatal error.
    #[error("{message}")]
    JobFatal { message: String },

    /// The platform refused to create a copy job.
    #[error("Copy job rejected: {message}")]
    JobRejected { message: String },

    /// The platform no longer knows a copy job that never reported its end.
    #[error("Copy job {job_id} is no longer known to the platform")]
    JobLost { job_id: String },

    /// A copy job did not reach a terminal state within the configured bound.
    #[error("Copy job {job_id} still running after {elapsed:?}")]
    PollTimeout { job_id: String, elapsed: Duration },

    /// Some children of a folder could not be moved.
    #[error("{failed} item(s) under {path} failed to move: {source}")]
    Incomplete {
        path: String,
        failed: usize,
        #[source]
        source: Box<ShiftError>,
    },

    /// One or more selected items failed.
    #[error("{failed} of {total} items failed to move: {source}")]
    SelectionFailed {
        failed: usize,
        total: usize,
        #[source]
        source: Box<ShiftError>,
    },

    /// A target name is not acceptable to the platform.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A move request that cannot be carried out as asked.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Reading or writing local state failed.
    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The platform returned something we could not interpret.
    #[error("Unexpected response: {message}")]
    Decode { message: String },
}

/// How a failure should be treated by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// 500-class server error.
    Transient,
    /// 429 or 503.
    Throttled,
    /// Failure without any status (connectivity).
    Unknown,
    /// Never retried.
    Permanent,
}

impl ShiftError {
    /// Create an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a storage error with path context.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Classify this error for retry decisions.
    ///
    /// Statuses other than 429 and 5xx are permanent: an unrecognised status
    /// is rethrown rather than blindly retried.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Http { status, .. } => match status {
                429 | 503 => FailureClass::Throttled,
                500..=599 => FailureClass::Transient,
                _ => FailureClass::Permanent,
            },
            Self::Network { .. } => FailureClass::Unknown,
            _ => FailureClass::Permanent,
        }
    }

    /// Whether this is a request validation failure that must never be retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::JobRejected { .. }
                | Self::InvalidName { .. }
                | Self::InvalidRequest { .. }
                | Self::InvalidConfig { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_classification() {
        assert_eq!(ShiftError::http(500, "boom").class(), FailureClass::Transient);
        assert_eq!(ShiftError::http(502, "bad gateway").class(), FailureClass::Transient);
        assert_eq!(ShiftError::http(503, "busy").class(), FailureClass::Throttled);
        assert_eq!(ShiftError::http(429, "slow down").class(), FailureClass::Throttled);
        assert_eq!(ShiftError::http(404, "missing").class(), FailureClass::Permanent);
        assert_eq!(ShiftError::http(409, "conflict").class(), FailureClass::Permanent);
    }

    #[test]
    fn test_statusless_failures_are_unknown() {
        assert_eq!(ShiftError::network("reset").class(), FailureClass::Unknown);
    }

    #[test]
    fn test_job_errors_are_permanent() {
        let fatal = ShiftError::JobFatal {
            message: "quota".into(),
        };
        assert_eq!(fatal.class(), FailureClass::Permanent);
        assert!(!fatal.is_validation());
        assert_eq!(fatal.to_string(), "quota");

        let rejected = ShiftError::JobRejected {
            message: "bad uri".into(),
        };
        assert!(rejected.is_validation());

        let lost = ShiftError::JobLost {
            job_id: "job-7".into(),
        };
        assert_eq!(lost.class(), FailureClass::Permanent);
        assert!(!lost.is_validation());
    }

    #[test]
    fn test_invalid_request_is_validation() {
        let err = ShiftError::invalid_request("cannot move '/a' into itself");
        assert!(err.is_validation());
        assert_eq!(err.class(), FailureClass::Permanent);
        assert_eq!(err.to_string(), "Invalid request: cannot move '/a' into itself");
    }
}
