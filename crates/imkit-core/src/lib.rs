//! # imkit-core
//!
//! Core value types for the imkit format registry and resource governor.
//!
//! This crate has no I/O and no global state. It defines the vocabulary the
//! other crates speak:
//!
//! - [`ImageFormat`] - closed set of format identifiers, with the raw-name and
//!   file-extension translation rules
//! - [`FormatDescriptor`] - immutable capabilities of one format
//! - [`Percentage`] - percent values, with a checked `[0, 100]` constructor
//! - [`QuantumDepth`] - compile-time sample depth of the pixel store
//! - [`ColorSpace`], [`Compression`], [`Interlace`], [`Density`] - header
//!   properties reported by probing
//!
//! ## Crate Structure
//!
//! ```text
//! imkit-core (this crate)
//!    ^
//!    |
//!    +-- imkit-io (engine, registry, limits, probing)
//!           ^
//!           |
//!           +-- imkit-cli
//! ```
//!
//! ## Feature Flags
//!
//! - `q16` - 16-bit quantum (default)
//! - `q8` - 8-bit quantum
//! - `hdri` - floating point quantum

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod descriptor;
pub mod error;
pub mod format;
pub mod percentage;
pub mod properties;
pub mod quantum;

pub use descriptor::FormatDescriptor;
pub use error::{CoreError, Result};
pub use format::ImageFormat;
pub use percentage::Percentage;
pub use properties::{ColorSpace, Compression, Density, DensityUnit, Interlace};
pub use quantum::QuantumDepth;

/// Prelude module for convenient imports.
///
/// ```
/// use imkit_core::prelude::*;
///
/// assert_eq!(ImageFormat::from_raw_name("3G2"), ImageFormat::ThreeG2);
/// ```
pub mod prelude {
    pub use crate::descriptor::FormatDescriptor;
    pub use crate::error::{CoreError, Result};
    pub use crate::format::ImageFormat;
    pub use crate::percentage::Percentage;
    pub use crate::quantum::QuantumDepth;
}
