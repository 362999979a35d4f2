//! Error types for imkit-core operations.
//!
//! The core crate only fails in two ways: a caller hands it an argument that
//! can never be valid (empty buffer, out-of-range percentage), or a string
//! cannot be parsed into one of the closed identifier sets.
//!
//! # Usage
//!
//! ```rust
//! use imkit_core::{CoreError, Percentage};
//!
//! let err = Percentage::ratio(150.0).unwrap_err();
//! assert!(matches!(err, CoreError::InvalidArgument { .. }));
//! assert!(err.to_string().contains("percentage"));
//! ```
//!
//! # Used By
//!
//! - [`crate::percentage::Percentage`] - range checks
//! - [`crate::format::ImageFormat`] - `FromStr` parsing
//! - `imkit-io` - wrapped into `IoError::Core`

use thiserror::Error;

/// Result type alias using [`CoreError`] as the error type.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced by the core value types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An argument was rejected before any work was attempted.
    ///
    /// `name` is the parameter name as the caller sees it.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Offending parameter name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// A string could not be parsed into an identifier.
    #[error("cannot parse '{value}' as {kind}")]
    Parse {
        /// What was being parsed (e.g. "image format")
        kind: &'static str,
        /// The rejected input
        value: String,
    },
}

impl CoreError {
    /// Creates an [`CoreError::InvalidArgument`] error.
    #[inline]
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Creates a [`CoreError::Parse`] error.
    #[inline]
    pub fn parse(kind: &'static str, value: impl Into<String>) -> Self {
        Self::Parse {
            kind,
            value: value.into(),
        }
    }

    /// Returns `true` if this is an argument error.
    #[inline]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_names_parameter() {
        let err = CoreError::invalid_argument("data", "value cannot be empty");
        let msg = err.to_string();
        assert!(msg.contains("'data'"));
        assert!(msg.contains("empty"));
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_parse_error() {
        let err = CoreError::parse("image format", "NOPE");
        assert_eq!(err.to_string(), "cannot parse 'NOPE' as image format");
        assert!(!err.is_invalid_argument());
    }
}
