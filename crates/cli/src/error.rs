//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// The liveness target names a feed that was never registered
    #[error("Liveness feed '{feed}' is not registered")]
    LivenessTarget { feed: String },

    /// Feed adapters that stopped with an error
    #[error("{count} feed adapter(s) failed, first: {first}")]
    FeedsFailed { count: usize, first: String },

    /// The dispatcher thread did not finish cleanly
    #[error("Dispatcher task failed: {message}")]
    Dispatcher { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn liveness_target(feed: impl Into<String>) -> Self {
        Self::LivenessTarget { feed: feed.into() }
    }

    pub fn feeds_failed(errors: &[String]) -> Self {
        Self::FeedsFailed {
            count: errors.len(),
            first: errors.first().cloned().unwrap_or_default(),
        }
    }

    pub fn dispatcher(message: impl Into<String>) -> Self {
        Self::Dispatcher {
            message: message.into(),
        }
    }
}
