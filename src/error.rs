use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, ApmError>;

/// Errors produced by the tracking engine and export pipeline
#[derive(Debug, Error)]
pub enum ApmError {
    /// Session lifecycle contract violation (start while recording,
    /// stop while idle)
    #[error("session error: {message}")]
    Session {
        /// What the caller did wrong
        message: String,
    },

    /// A configuration value failed validation
    #[error("configuration error for {parameter}: {message}")]
    Configuration {
        /// Why the value was rejected
        message: String,
        /// The offending parameter
        parameter: String,
    },

    /// The export queue is at capacity; the request was not enqueued
    #[error("export queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// The export worker is gone or dropped the result channel
    #[error("export pipeline unavailable: {message}")]
    Export {
        /// What went missing
        message: String,
    },

    /// A filesystem write failed
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Destination that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Extension trait for error handling utilities
pub(crate) trait ErrorExt {
    /// Whether retrying the operation once is worthwhile
    fn is_transient(&self) -> bool;
}

impl ErrorExt for ApmError {
    fn is_transient(&self) -> bool {
        matches!(self, ApmError::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ApmError::QueueFull { capacity: 8 };
        assert_eq!(error.to_string(), "export queue is full (capacity 8)");

        let error = ApmError::Configuration {
            message: "must be greater than zero".to_string(),
            parameter: "window".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "configuration error for window: must be greater than zero"
        );
    }

    #[test]
    fn test_transient_classification() {
        let io = ApmError::Io {
            path: PathBuf::from("/tmp/apm_data.txt"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(io.is_transient());

        let session = ApmError::Session {
            message: "already recording".to_string(),
        };
        assert!(!session.is_transient());
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;

        let error = ApmError::Io {
            path: PathBuf::from("/tmp/apm_data.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(error.source().is_some());
    }
}
