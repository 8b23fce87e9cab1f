//! GPIO backend error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::LineId;

/// Errors raised while preparing the GPIO subsystem or arming a line.
#[derive(Error, Debug)]
pub enum HalError {
    /// The GPIO subsystem could not be initialized
    #[error("GPIO setup failed: {0}")]
    SetupFailed(String),

    /// The line is not covered by the pin map
    #[error("line {line} is outside the pin map ({lines} lines)")]
    InvalidLine { line: LineId, lines: usize },

    /// An interrupt handler is already installed on the line
    #[error("line {0} already has an interrupt handler")]
    LineBusy(LineId),

    /// `register` was called before a successful `setup`
    #[error("GPIO platform not initialized")]
    NotInitialized,

    /// Unknown edge-mode spelling
    #[error("invalid edge mode '{0}' (expected falling, rising or both)")]
    InvalidEdgeMode(String),

    /// A sysfs attribute could not be read or written
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backend is not available on this platform
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl HalError {
    /// Wrap an I/O error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HalError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for GPIO backend operations
pub type HalResult<T> = std::result::Result<T, HalError>;
