//! Error types for HapticPlayer
//!
//! This module defines custom error types used throughout the crate.
//! We use thiserror for convenient error type definitions and anyhow for
//! application-level error handling in the binary.

use thiserror::Error;

/// Main error type for HapticPlayer
#[derive(Error, Debug)]
pub enum HapticPlayerError {
    /// Media engine failures (source binding, preparation)
    #[error("Engine error: {0}")]
    Engine(String),

    /// An engine operation was issued in a state that does not allow it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Haptic device errors
    #[error("Haptics error: {0}")]
    Haptics(String),

    /// Unknown haptic effect name or index
    #[error("Haptic effect error: {0}")]
    HapticEffect(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl HapticPlayerError {
    /// Create an invalid-state error from string
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        HapticPlayerError::InvalidState(msg.into())
    }

    /// Whether this error only means the engine was used out of order
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, HapticPlayerError::InvalidState(_))
    }
}

/// Convenience type alias for Results in HapticPlayer
pub type Result<T> = std::result::Result<T, HapticPlayerError>;

/// Extension trait for converting other errors to HapticPlayerError
pub trait IntoPlayerError<T> {
    /// Convert this error into a HapticPlayerError with the given context
    fn haptics_err(self, context: &str) -> Result<T>;
    fn config_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoPlayerError<T> for std::result::Result<T, E> {
    fn haptics_err(self, context: &str) -> Result<T> {
        self.map_err(|e| HapticPlayerError::Haptics(format!("{}: {}", context, e)))
    }

    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| HapticPlayerError::Config(format!("{}: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HapticPlayerError::NotFound("Invalid Video File".to_string());
        assert_eq!(err.to_string(), "Resource not found: Invalid Video File");

        let err = HapticPlayerError::invalid_state("start() called in Idle");
        assert_eq!(err.to_string(), "Invalid state: start() called in Idle");
        assert!(err.is_invalid_state());
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let player_err: HapticPlayerError = io_err.into();
        assert!(matches!(player_err, HapticPlayerError::FileIO(_)));
        assert!(!player_err.is_invalid_state());
    }

    #[test]
    fn test_into_player_error_trait() {
        let result: std::result::Result<(), &str> = Err("device busy");
        let converted = result.haptics_err("Opening effect file");

        match converted {
            Err(HapticPlayerError::Haptics(msg)) => {
                assert_eq!(msg, "Opening effect file: device busy");
            }
            _ => panic!("Expected Haptics error"),
        }
    }
}
