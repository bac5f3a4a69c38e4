//! Error types shared across gimbal crates.

use thiserror::Error;

/// Main error type for gimbal applications.
#[derive(Error, Debug)]
pub enum Error {
    /// Scene graph errors raised by transform or camera operations
    #[error("Scene error: {0}")]
    Scene(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Logging could not be initialized
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Result type alias using gimbal's Error type.
pub type Result<T> = std::result::Result<T, Error>;
