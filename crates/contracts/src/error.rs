//! Layered error definitions
//!
//! Categorized by source: config / source (feed collaborators) / output

use std::time::Duration;

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Output Errors =====
    /// Output action rejected a parameter or failed to render
    #[error("output '{action}' error: {message}")]
    Output { action: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create output action error
    pub fn output(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Output {
            action: action.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by an external message source or outbound transport.
///
/// Transient variants send the adapter into backoff; the others end the
/// adapter's thread because retrying cannot succeed without intervention.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network/socket failure, dropped session, server hiccup
    #[error("transient source error: {message}")]
    Transient { message: String },

    /// The source asked us to slow down
    #[error("rate limited by source (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Credentials were refused
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// Connection parameters are unusable (bad host, missing mailbox, ...)
    #[error("source misconfigured: {message}")]
    Configuration { message: String },
}

impl SourceError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the adapter must give up instead of backing off
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Configuration { .. }
        )
    }

    /// Source-provided wait hint, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SourceError::authentication("bad password").is_fatal());
        assert!(SourceError::configuration("no such mailbox").is_fatal());
        assert!(!SourceError::transient("reset by peer").is_fatal());
        assert!(!SourceError::RateLimited { retry_after: None }.is_fatal());
    }

    #[test]
    fn test_io_error_is_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = SourceError::from(io);
        assert!(matches!(err, SourceError::Transient { .. }));
    }

    #[test]
    fn test_retry_after_hint() {
        let err = SourceError::RateLimited {
            retry_after: Some(Duration::from_secs(15)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(15)));
        assert_eq!(SourceError::transient("x").retry_after(), None);
    }
}
