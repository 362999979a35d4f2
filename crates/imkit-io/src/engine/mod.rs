//! Format engine interface.
//!
//! The registry never decides on its own which formats exist. It asks a
//! [`FormatEngine`]: the component that owns the codec modules and the
//! magic-byte sniffer. The engine speaks in [`RawFormatRecord`]s with
//! free-form names; the registry translates those into
//! [`FormatDescriptor`]s keyed by [`ImageFormat`].
//!
//! # List discipline
//!
//! Enumeration hands out a [`RawFormatList`] that the engine may back with
//! its own storage. Every list obtained from [`FormatEngine::create_list`]
//! must be returned through [`FormatEngine::dispose_list`], on error paths
//! too. [`ListGuard`] does this on drop.
//!
//! Records are fetched by index through [`FormatEngine::record_at`]; callers
//! never compute record addresses themselves.

mod builtin;

pub use builtin::BuiltinEngine;

use imkit_core::{FormatDescriptor, ImageFormat};

use crate::IoResult;

/// One format as described by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawFormatRecord {
    /// Engine spelling of the format name, e.g. `"3FR"`, `"PNG24"`.
    pub name: String,
    /// Engine spelling of the codec module name.
    pub module: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Decoder present.
    pub can_read: bool,
    /// Encoder present.
    pub can_write: bool,
    /// One file may hold several frames.
    pub multi_frame: bool,
    /// Decoder is safe to run concurrently.
    pub read_multithreaded: bool,
    /// Encoder is safe to run concurrently.
    pub write_multithreaded: bool,
}

impl RawFormatRecord {
    /// Translates the record into a descriptor.
    ///
    /// Returns `None` when the record's name does not translate to a known
    /// identifier. An untranslatable module name becomes
    /// [`ImageFormat::Unknown`] but does not reject the record.
    pub fn to_descriptor(&self) -> Option<FormatDescriptor> {
        let format = ImageFormat::from_raw_name(&self.name);
        if format.is_unknown() {
            return None;
        }

        let module_format = self
            .module
            .as_deref()
            .map(ImageFormat::from_raw_name)
            .unwrap_or(ImageFormat::Unknown);

        let mut descriptor = FormatDescriptor::new(format, module_format)
            .with_reading(self.can_read)
            .with_writing(self.can_write)
            .with_multiple_frames(self.multi_frame)
            .with_multithreaded(self.read_multithreaded, self.write_multithreaded);

        if let Some(description) = &self.description {
            descriptor = descriptor.with_description(description.as_str());
        }
        if let Some(mime) = &self.mime_type {
            descriptor = descriptor.with_mime_type(mime.as_str());
        }

        Some(descriptor)
    }
}

/// Handle to an engine-owned format list.
///
/// Not `Clone`: there is exactly one owner, and disposing consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct RawFormatList {
    id: u64,
    len: usize,
}

impl RawFormatList {
    /// Creates a handle. Only engines should call this.
    pub fn new(id: u64, len: usize) -> Self {
        Self { id, len }
    }

    /// Engine-assigned identity of the list.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of records in the list.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list has no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The component that knows which formats exist.
///
/// Implementations must be usable from several threads. Every call is
/// synchronous; there are no timeouts at this layer.
pub trait FormatEngine: Send + Sync {
    /// Builds the primary format list.
    ///
    /// Fails only when the engine itself cannot be reached.
    fn create_list(&self) -> IoResult<RawFormatList>;

    /// Returns record `index` of `list`, or `None` if the engine has nothing
    /// usable at that position.
    fn record_at(&self, list: &RawFormatList, index: usize) -> Option<RawFormatRecord>;

    /// Releases a list obtained from [`Self::create_list`].
    fn dispose_list(&self, list: RawFormatList);

    /// Describes a format by engine name, including formats that are not
    /// part of the primary list.
    fn describe_by_name(&self, name: &str) -> Option<RawFormatRecord>;

    /// Classifies a non-empty header by its magic bytes.
    fn sniff_header(&self, header: &[u8]) -> Option<RawFormatRecord>;
}

/// Returns a list to its engine when dropped.
pub struct ListGuard<'a> {
    engine: &'a dyn FormatEngine,
    list: Option<RawFormatList>,
}

impl<'a> ListGuard<'a> {
    /// Creates a list on `engine` and guards it.
    pub fn create(engine: &'a dyn FormatEngine) -> IoResult<Self> {
        let list = engine.create_list()?;
        Ok(Self {
            engine,
            list: Some(list),
        })
    }

    /// Number of records in the guarded list.
    pub fn len(&self) -> usize {
        self.list.as_ref().map_or(0, RawFormatList::len)
    }

    /// Whether the guarded list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches record `index` from the guarded list.
    pub fn record_at(&self, index: usize) -> Option<RawFormatRecord> {
        self.list
            .as_ref()
            .and_then(|list| self.engine.record_at(list, index))
    }
}

impl Drop for ListGuard<'_> {
    fn drop(&mut self) {
        if let Some(list) = self.list.take() {
            self.engine.dispose_list(list);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, module: Option<&str>) -> RawFormatRecord {
        RawFormatRecord {
            name: name.into(),
            module: module.map(Into::into),
            description: Some("test".into()),
            can_read: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_translation() {
        let d = record("PNG-24", Some("PNG")).to_descriptor().unwrap();
        assert_eq!(d.format(), ImageFormat::Png24);
        assert_eq!(d.module_format(), ImageFormat::Png);
        assert!(d.supports_reading());
        assert!(!d.supports_writing());
        assert_eq!(d.description(), Some("test"));
    }

    #[test]
    fn test_unparseable_name_rejected() {
        assert!(record("MPC", Some("MPC")).to_descriptor().is_none());
        assert!(record("", None).to_descriptor().is_none());
    }

    #[test]
    fn test_unparseable_module_kept_as_unknown() {
        let d = record("3FR", Some("DNG-RAW-X")).to_descriptor().unwrap();
        assert_eq!(d.format(), ImageFormat::ThreeFr);
        assert_eq!(d.module_format(), ImageFormat::Unknown);
    }

    #[test]
    fn test_guard_disposes() {
        let engine = BuiltinEngine::new();
        {
            let guard = ListGuard::create(&engine).unwrap();
            assert!(!guard.is_empty());
            assert_eq!(engine.outstanding_lists(), 1);
        }
        assert_eq!(engine.outstanding_lists(), 0);
    }
}
