//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Dispatcher thread could not be started
    #[error("failed to spawn dispatcher thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Dispatcher thread panicked
    #[error("dispatcher thread panicked: {message}")]
    Panicked { message: String },
}

impl DispatcherError {
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::Panicked {
            message: message.into(),
        }
    }
}
