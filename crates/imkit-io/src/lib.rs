//! # imkit-io
//!
//! Format registry, resource limits and header probing for imkit.
//!
//! This crate owns the process-wide state of the toolkit:
//!
//! - **Format registry** - descriptors for every format the engine knows,
//!   built lazily on first use and looked up by format, file extension or
//!   header bytes
//! - **Resource limits** - ceilings on width, height, area, memory and the
//!   other governed resources, checked before any work is done
//! - **Policy** - a YAML policy file that sets limits and disables formats
//! - **Log events** - an opt-in callback sink for configure, resource and
//!   module events
//! - **Header probing** - dimensions, depth and color space read from the
//!   header without decoding pixels
//!
//! # Architecture
//!
//! ```text
//! FormatEngine (raw records) --> FormatRegistry (typed descriptors)
//!                                      |
//!          ImageInfo::read ------------+--> ResourceLimits::check_*
//! ```
//!
//! The engine is a trait so the registry can be tested against scripted
//! engines; [`BuiltinEngine`] is the one used by [`FormatRegistry::global`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use imkit_core::ImageFormat;
//! use imkit_io::{FormatRegistry, ImageInfo, ResourceLimits};
//!
//! imkit_io::initialize()?;
//! ResourceLimits::global().set_width(16_000);
//!
//! let png = FormatRegistry::global().get(ImageFormat::Png)?;
//! assert!(png.is_some_and(|d| d.supports_reading()));
//!
//! let info = ImageInfo::read("input.png")?;
//! println!("{info}");
//! # Ok::<(), imkit_io::IoError>(())
//! ```
//!
//! # Feature Flags
//!
//! - `png`, `jpeg`, `gif`, `bmp`, `tiff`, `webp`, `pnm`, `qoi` - header
//!   probers (all default)
//! - `q8` / `hdri` - quantum depth, forwarded to `imkit-core`

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;

pub mod config;
pub mod detect;
pub mod engine;
pub mod environment;
pub mod info;
pub mod limits;
pub mod log;
pub mod registry;

#[cfg(feature = "bmp")]
pub mod bmp;
#[cfg(feature = "gif")]
pub mod gif;
#[cfg(feature = "jpeg")]
pub mod jpeg;
#[cfg(feature = "png")]
pub mod png;
#[cfg(feature = "pnm")]
pub mod pnm;
#[cfg(feature = "qoi")]
pub mod qoi;
#[cfg(feature = "tiff")]
pub mod tiff;
#[cfg(feature = "webp")]
pub mod webp;

pub use config::{Policy, ResourcePolicy};
pub use engine::{BuiltinEngine, FormatEngine, RawFormatList, RawFormatRecord};
pub use environment::{
    apply_policy, configure_path, delegates, features, initialize, initialize_with_path,
    initialize_with_policy, set_temp_directory, supported_formats, temp_directory, version,
};
pub use error::{IoError, IoResult};
pub use info::ImageInfo;
pub use limits::{LimitsSnapshot, ResourceLimits, ResourceType};
pub use log::{LogEvent, LogEvents};
pub use registry::FormatRegistry;
