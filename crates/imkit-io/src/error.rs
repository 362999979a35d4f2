//! Error types for registry, limits and probing operations.
//!
//! Absence is not an error in this crate: lookups that find nothing return
//! `Ok(None)`. Errors are reserved for bad arguments, an unreachable engine,
//! unreadable headers, exceeded limits and configuration problems.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use imkit_core::{CoreError, ImageFormat};

/// Registry, limits and probing error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Policy file could not be parsed or written.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Argument rejected before any engine call.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Offending parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The format engine could not produce its format list.
    #[error("format engine unavailable: {0}")]
    EngineUnavailable(String),

    /// No prober or registry entry for this data.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The header was recognized but is truncated or inconsistent.
    #[error("corrupt {format} header: {reason}")]
    CorruptHeader {
        /// Format whose header failed to parse.
        format: ImageFormat,
        /// What was wrong.
        reason: String,
    },

    /// A resource limit rejected the image.
    #[error("{resource} limit exceeded: {value} > {limit}")]
    LimitExceeded {
        /// Limit name, e.g. "width".
        resource: &'static str,
        /// Observed value.
        value: u64,
        /// Configured ceiling.
        limit: u64,
    },

    /// Required configuration file is missing.
    #[error("configuration file not found: {}", path.display())]
    ConfigNotFound {
        /// Path that was searched.
        path: PathBuf,
    },

    /// Error from a core value type.
    #[error(transparent)]
    Core(CoreError),
}

impl IoError {
    /// Creates an [`IoError::InvalidArgument`] error.
    #[inline]
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Creates an [`IoError::CorruptHeader`] error.
    #[inline]
    pub fn corrupt(format: ImageFormat, reason: impl Into<String>) -> Self {
        Self::CorruptHeader {
            format,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is an argument error.
    #[inline]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

impl From<CoreError> for IoError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidArgument { name, reason } => Self::InvalidArgument { name, reason },
            other => Self::Core(other),
        }
    }
}

/// Result type for registry, limits and probing operations.
pub type IoResult<T> = Result<T, IoError>;
