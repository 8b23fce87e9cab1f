//! Error types for isrmond

use gpio_hal::{HalError, LineId};
use thiserror::Error;

/// Monitor daemon errors
#[derive(Error, Debug)]
pub enum IsrError {
    /// The GPIO platform could not be initialized
    #[error("Unable to setup GPIO: {0}")]
    Setup(#[source] HalError),

    /// A line could not be armed for interrupts
    #[error("Unable to arm line {line}: {source}")]
    Registration {
        line: LineId,
        #[source]
        source: HalError,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Signal handler installation error
    #[error("Signal error: {0}")]
    Signal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IsrError {
    /// Process exit status for this error. Every startup failure is terminal.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Result type for isrmond operations
pub type Result<T> = std::result::Result<T, IsrError>;
