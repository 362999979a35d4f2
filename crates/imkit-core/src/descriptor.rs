//! Format descriptors.
//!
//! A [`FormatDescriptor`] records what the engine can do with one
//! [`ImageFormat`]: read it, write it, store several frames in one file, and
//! whether the codec is safe to run on several threads at once.
//!
//! Descriptors are immutable once built. Registries hand them out behind an
//! `Arc`, so a snapshot taken by one caller never changes under it.
//!
//! # Identity
//!
//! Two descriptors are equal when their `format` is equal; the descriptive
//! fields and `module_format` are ignored. Hashing uses `format` alone, the
//! same key equality compares.
//!
//! ```rust
//! use imkit_core::{FormatDescriptor, ImageFormat};
//!
//! let jpg = FormatDescriptor::new(ImageFormat::Jpg, ImageFormat::Jpeg)
//!     .with_description("Joint Photographic Experts Group JFIF format")
//!     .with_reading(true)
//!     .with_writing(true);
//!
//! assert_eq!(jpg.to_string(), "Jpg: Joint Photographic Experts Group JFIF format (+R+W-M)");
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::format::ImageFormat;

/// Capabilities of one image format.
#[derive(Debug, Clone)]
pub struct FormatDescriptor {
    format: ImageFormat,
    module_format: ImageFormat,
    description: Option<String>,
    mime_type: Option<String>,
    supports_reading: bool,
    supports_writing: bool,
    supports_multiple_frames: bool,
    can_read_multithreaded: bool,
    can_write_multithreaded: bool,
}

impl FormatDescriptor {
    /// Creates a descriptor with every capability switched off.
    pub fn new(format: ImageFormat, module_format: ImageFormat) -> Self {
        Self {
            format,
            module_format,
            description: None,
            mime_type: None,
            supports_reading: false,
            supports_writing: false,
            supports_multiple_frames: false,
            can_read_multithreaded: false,
            can_write_multithreaded: false,
        }
    }

    /// Sets the human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Sets whether the format can be read.
    pub fn with_reading(mut self, value: bool) -> Self {
        self.supports_reading = value;
        self
    }

    /// Sets whether the format can be written.
    pub fn with_writing(mut self, value: bool) -> Self {
        self.supports_writing = value;
        self
    }

    /// Sets whether one file can hold several frames.
    pub fn with_multiple_frames(mut self, value: bool) -> Self {
        self.supports_multiple_frames = value;
        self
    }

    /// Sets the multithreaded read/write flags.
    pub fn with_multithreaded(mut self, read: bool, write: bool) -> Self {
        self.can_read_multithreaded = read;
        self.can_write_multithreaded = write;
        self
    }

    /// The identifier; the registry key.
    #[inline]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// The codec module implementing this format.
    #[inline]
    pub fn module_format(&self) -> ImageFormat {
        self.module_format
    }

    /// Human-readable description, if the engine supplied one.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// MIME type, if the engine supplied one.
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Whether the format can be read.
    #[inline]
    pub fn supports_reading(&self) -> bool {
        self.supports_reading
    }

    /// Whether the format can be written.
    #[inline]
    pub fn supports_writing(&self) -> bool {
        self.supports_writing
    }

    /// Whether one file can hold several frames.
    #[inline]
    pub fn supports_multiple_frames(&self) -> bool {
        self.supports_multiple_frames
    }

    /// Whether the decoder may run on several threads concurrently.
    #[inline]
    pub fn can_read_multithreaded(&self) -> bool {
        self.can_read_multithreaded
    }

    /// Whether the encoder may run on several threads concurrently.
    #[inline]
    pub fn can_write_multithreaded(&self) -> bool {
        self.can_write_multithreaded
    }

    /// Whether this descriptor is an alias served by another module.
    #[inline]
    pub fn is_alias(&self) -> bool {
        self.format != self.module_format
    }
}

impl PartialEq for FormatDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format
    }
}

impl Eq for FormatDescriptor {}

impl Hash for FormatDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.format.hash(state);
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |b: bool| if b { '+' } else { '-' };
        write!(
            f,
            "{}: {} ({}R{}W{}M)",
            self.format,
            self.description.as_deref().unwrap_or(""),
            flag(self.supports_reading),
            flag(self.supports_writing),
            flag(self.supports_multiple_frames),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_ignores_descriptive_fields() {
        let a = FormatDescriptor::new(ImageFormat::Png, ImageFormat::Png).with_description("one");
        let b = FormatDescriptor::new(ImageFormat::Png, ImageFormat::Png)
            .with_description("two")
            .with_reading(true);
        assert_eq!(a, b);

        let c = FormatDescriptor::new(ImageFormat::Png8, ImageFormat::Png);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hash_set_dedups_on_format() {
        let mut set = HashSet::new();
        set.insert(FormatDescriptor::new(ImageFormat::Gif, ImageFormat::Gif));
        set.insert(FormatDescriptor::new(ImageFormat::Gif, ImageFormat::Gif).with_writing(true));
        set.insert(FormatDescriptor::new(ImageFormat::Gif87, ImageFormat::Gif));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_hash_agrees_with_eq_across_modules() {
        use std::collections::hash_map::DefaultHasher;

        let hash = |d: &FormatDescriptor| {
            let mut h = DefaultHasher::new();
            d.hash(&mut h);
            h.finish()
        };
        let dng = FormatDescriptor::new(ImageFormat::ThreeFr, ImageFormat::Dng);
        let unknown = FormatDescriptor::new(ImageFormat::ThreeFr, ImageFormat::Unknown);
        assert_eq!(dng, unknown);
        assert_eq!(hash(&dng), hash(&unknown));

        let set: HashSet<_> = [dng, unknown].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_display_flags() {
        let gif = FormatDescriptor::new(ImageFormat::Gif, ImageFormat::Gif)
            .with_description("CompuServe graphics interchange format")
            .with_reading(true)
            .with_writing(true)
            .with_multiple_frames(true);
        assert_eq!(gif.to_string(), "Gif: CompuServe graphics interchange format (+R+W+M)");

        let bare = FormatDescriptor::new(ImageFormat::Svg, ImageFormat::Svg);
        assert_eq!(bare.to_string(), "Svg:  (-R-W-M)");
    }

    #[test]
    fn test_alias() {
        assert!(FormatDescriptor::new(ImageFormat::Jpg, ImageFormat::Jpeg).is_alias());
        assert!(!FormatDescriptor::new(ImageFormat::Jpeg, ImageFormat::Jpeg).is_alias());
    }
}
