//! Error types for psi-collect

use thiserror::Error;

/// Collector error type
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// A user-supplied filter is not a valid regular expression
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The URL does not name a `.tar` file
    #[error("Malformed archive URL: {0}")]
    MalformedUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The tar file could not be read
    #[error("Archive error: {0}")]
    Archive(String),

    /// Interrupted from outside; never retried
    #[error("Operation cancelled")]
    Cancelled,
}

impl CollectError {
    /// Whether another attempt could succeed
    ///
    /// Cancellation and bad input are final; everything else is treated as
    /// transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            CollectError::Cancelled
                | CollectError::InvalidPattern { .. }
                | CollectError::MalformedUrl(_)
        )
    }
}

impl From<reqwest::Error> for CollectError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CollectError::HttpStatus {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => CollectError::Network(err.to_string()),
        }
    }
}

/// Result type for collector operations
pub type CollectResult<T> = Result<T, CollectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CollectError::Network("reset".into()).is_retryable());
        assert!(CollectError::HttpStatus { status: 503, url: "u".into() }.is_retryable());
        assert!(!CollectError::Cancelled.is_retryable());
        assert!(!CollectError::MalformedUrl("x".into()).is_retryable());
    }
}
