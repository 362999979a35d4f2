//! Format registry: the catalog of formats the engine can handle.
//!
//! The registry answers one question three ways: can this identifier, this
//! file extension, or this byte sequence be processed, and with what
//! capabilities?
//!
//! # Architecture
//!
//! The catalog is built lazily on first access by enumerating every record
//! the [`FormatEngine`] offers, then layering in the stealth aliases `DIB`
//! and `TIF`, which the engine resolves by name but does not enumerate.
//! Exactly one build pass runs under concurrent first access. A failed
//! build is not cached; the next caller tries again.
//!
//! Every lookup resolves through the same catalog under one lock, so an
//! [`FormatRegistry::unregister`] is seen at once by identifier, extension
//! and header lookups.
//!
//! # Insertion order
//!
//! Records are inserted keyed by identifier and the last write wins. When
//! two engine records translate to the same identifier, the later one in
//! engine order is kept.
//!
//! # Example
//!
//! ```rust
//! use imkit_core::ImageFormat;
//! use imkit_io::FormatRegistry;
//!
//! let registry = FormatRegistry::global();
//!
//! let png = registry.get(ImageFormat::Png).unwrap().unwrap();
//! assert!(png.supports_reading());
//!
//! let by_ext = registry.get_by_extension("scan.TIF").unwrap().unwrap();
//! assert_eq!(by_ext.format(), ImageFormat::Tif);
//!
//! let header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
//! let sniffed = registry.get_by_header(&header).unwrap().unwrap();
//! assert_eq!(sniffed.format(), ImageFormat::Png);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use imkit_core::{FormatDescriptor, ImageFormat};
use tracing::{debug, trace};

use crate::engine::{BuiltinEngine, FormatEngine, ListGuard, RawFormatRecord};
use crate::log::{self, LogEvents};
use crate::{IoError, IoResult};

/// Names resolvable through the engine but absent from its enumeration.
pub const STEALTH_ALIASES: [&str; 2] = ["DIB", "TIF"];

type Catalog = HashMap<ImageFormat, Arc<FormatDescriptor>>;

/// Catalog of format descriptors keyed by identifier.
pub struct FormatRegistry {
    engine: Arc<dyn FormatEngine>,
    catalog: RwLock<Option<Catalog>>,
    build_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl FormatRegistry {
    /// Creates an unbuilt registry over `engine`.
    pub fn new(engine: Arc<dyn FormatEngine>) -> Self {
        Self {
            engine,
            catalog: RwLock::new(None),
            build_lock: Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Returns the process-wide registry over the built-in engine.
    pub fn global() -> &'static FormatRegistry {
        static INSTANCE: OnceLock<FormatRegistry> = OnceLock::new();
        INSTANCE.get_or_init(|| FormatRegistry::new(Arc::new(BuiltinEngine::new())))
    }

    /// Looks up a descriptor by identifier.
    pub fn get(&self, format: ImageFormat) -> IoResult<Option<Arc<FormatDescriptor>>> {
        self.with_catalog(|catalog| catalog.get(&format).cloned())
    }

    /// Looks up a descriptor by the extension of `path`.
    ///
    /// The extension is translated like an engine name (case-insensitive,
    /// hyphens stripped, `3fr`/`3g2`/`3gp` remapped). Paths without a
    /// recognized extension return `Ok(None)` without building the catalog.
    pub fn get_by_extension<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> IoResult<Option<Arc<FormatDescriptor>>> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(IoError::invalid_argument("path", "must not be empty"));
        }

        let format = ImageFormat::from_extension(path);
        if format.is_unknown() {
            trace!(path = %path.display(), "no format for extension");
            return Ok(None);
        }
        self.get(format)
    }

    /// Classifies `data` by its magic bytes and looks the result up.
    ///
    /// Returns `Ok(None)` when the engine cannot classify the header or the
    /// classified format has been unregistered.
    pub fn get_by_header(&self, data: &[u8]) -> IoResult<Option<Arc<FormatDescriptor>>> {
        if data.is_empty() {
            return Err(IoError::invalid_argument("data", "must not be empty"));
        }
        self.ensure_built()?;

        let Some(record) = self.engine.sniff_header(data) else {
            return Ok(None);
        };
        let format = ImageFormat::from_raw_name(&record.name);
        if format.is_unknown() {
            trace!(name = %record.name, "sniffed name has no identifier");
            return Ok(None);
        }
        self.get(format)
    }

    /// Returns every descriptor, ordered by identifier.
    pub fn all(&self) -> IoResult<Vec<Arc<FormatDescriptor>>> {
        self.with_catalog(|catalog| {
            let mut all: Vec<_> = catalog.values().cloned().collect();
            all.sort_by_key(|d| d.format());
            all
        })
    }

    /// Removes a format. Returns `false` if it was not registered.
    pub fn unregister(&self, format: ImageFormat) -> IoResult<bool> {
        self.ensure_built()?;
        let removed = {
            let mut guard = self.catalog.write().unwrap_or_else(|e| e.into_inner());
            guard
                .as_mut()
                .is_some_and(|catalog| catalog.remove(&format).is_some())
        };
        if removed {
            log::emit(LogEvents::MODULE, format!("unregistered format {format}"));
        }
        Ok(removed)
    }

    /// Whether an extension such as `"png"` or `".PNG"` resolves to a
    /// registered format. Build failures count as unsupported.
    pub fn supports_extension(&self, ext: &str) -> bool {
        let format = ImageFormat::from_raw_name(ext.trim_start_matches('.'));
        if format.is_unknown() {
            return false;
        }
        matches!(self.get(format), Ok(Some(_)))
    }

    /// Number of registered formats.
    pub fn len(&self) -> IoResult<usize> {
        self.with_catalog(HashMap::len)
    }

    /// Whether no format is registered.
    pub fn is_empty(&self) -> IoResult<bool> {
        self.with_catalog(HashMap::is_empty)
    }

    /// Whether the catalog has been built.
    pub fn is_built(&self) -> bool {
        self.catalog.read().is_ok_and(|guard| guard.is_some())
    }

    /// Number of completed build passes.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Acquire)
    }

    fn with_catalog<R>(&self, f: impl FnOnce(&Catalog) -> R) -> IoResult<R> {
        self.ensure_built()?;
        let guard = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .map(f)
            .ok_or_else(|| IoError::EngineUnavailable("format catalog not built".into()))
    }

    fn ensure_built(&self) -> IoResult<()> {
        if self.is_built() {
            return Ok(());
        }

        let _building = self.build_lock.lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have finished while we waited.
        if self.is_built() {
            return Ok(());
        }

        let catalog = self.build()?;
        let count = catalog.len();
        *self.catalog.write().unwrap_or_else(|e| e.into_inner()) = Some(catalog);
        self.builds.fetch_add(1, Ordering::AcqRel);

        debug!(formats = count, "format registry built");
        log::emit(LogEvents::MODULE, format!("loaded {count} formats"));
        Ok(())
    }

    fn build(&self) -> IoResult<Catalog> {
        let list = ListGuard::create(self.engine.as_ref())?;
        let mut catalog = Catalog::with_capacity(list.len() + STEALTH_ALIASES.len());

        for index in 0..list.len() {
            match list.record_at(index) {
                Some(record) => insert(&mut catalog, &record),
                None => trace!(index, "engine returned no record"),
            }
        }

        for name in STEALTH_ALIASES {
            match self.engine.describe_by_name(name) {
                Some(record) => insert(&mut catalog, &record),
                None => trace!(name, "stealth alias not described by engine"),
            }
        }

        Ok(catalog)
    }
}

fn insert(catalog: &mut Catalog, record: &RawFormatRecord) {
    match record.to_descriptor() {
        Some(descriptor) => {
            catalog.insert(descriptor.format(), Arc::new(descriptor));
        }
        None => trace!(name = %record.name, "skipping untranslatable format record"),
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("built", &self.is_built())
            .field("builds", &self.build_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RawFormatList;

    fn record(name: &str, module: &str, description: &str) -> RawFormatRecord {
        RawFormatRecord {
            name: name.into(),
            module: Some(module.into()),
            description: Some(description.into()),
            can_read: true,
            ..Default::default()
        }
    }

    /// Engine serving a fixed list; fails `create_list` until `failures`
    /// reaches zero.
    struct ScriptedEngine {
        records: Vec<RawFormatRecord>,
        failures: AtomicUsize,
        created: AtomicUsize,
        disposed: AtomicUsize,
    }

    impl ScriptedEngine {
        fn new(records: Vec<RawFormatRecord>, failures: usize) -> Self {
            Self {
                records,
                failures: AtomicUsize::new(failures),
                created: AtomicUsize::new(0),
                disposed: AtomicUsize::new(0),
            }
        }
    }

    impl FormatEngine for ScriptedEngine {
        fn create_list(&self) -> IoResult<RawFormatList> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(IoError::EngineUnavailable("scripted failure".into()));
            }
            let id = self.created.fetch_add(1, Ordering::SeqCst) as u64;
            Ok(RawFormatList::new(id, self.records.len()))
        }

        fn record_at(&self, _list: &RawFormatList, index: usize) -> Option<RawFormatRecord> {
            self.records.get(index).cloned()
        }

        fn dispose_list(&self, _list: RawFormatList) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }

        fn describe_by_name(&self, name: &str) -> Option<RawFormatRecord> {
            match name {
                "DIB" => Some(record("DIB", "BMP", "stealth dib")),
                "TIF" => Some(record("TIF", "TIFF", "stealth tif")),
                _ => None,
            }
        }

        fn sniff_header(&self, header: &[u8]) -> Option<RawFormatRecord> {
            header
                .starts_with(b"PNG")
                .then(|| record("PNG", "PNG", "sniffed"))
        }
    }

    #[test]
    fn test_builds_once_and_includes_stealth() {
        let engine = Arc::new(ScriptedEngine::new(
            vec![record("PNG", "PNG", "png"), record("MPC", "MPC", "skipped")],
            0,
        ));
        let registry = FormatRegistry::new(engine.clone());
        assert!(!registry.is_built());

        assert_eq!(registry.len().unwrap(), 3);
        assert!(registry.get(ImageFormat::Dib).unwrap().is_some());
        assert!(registry.get(ImageFormat::Tif).unwrap().is_some());
        assert!(registry.get(ImageFormat::Png).unwrap().is_some());

        assert_eq!(registry.build_count(), 1);
        assert_eq!(engine.created.load(Ordering::SeqCst), 1);
        assert_eq!(engine.disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let engine = Arc::new(ScriptedEngine::new(
            vec![record("PNG", "PNG", "first"), record("png", "PNG", "second")],
            0,
        ));
        let registry = FormatRegistry::new(engine);
        let png = registry.get(ImageFormat::Png).unwrap().unwrap();
        assert_eq!(png.description(), Some("second"));
    }

    #[test]
    fn test_failed_build_not_cached() {
        let engine = Arc::new(ScriptedEngine::new(vec![record("PNG", "PNG", "png")], 1));
        let registry = FormatRegistry::new(engine.clone());

        let err = registry.get(ImageFormat::Png).unwrap_err();
        assert!(matches!(err, IoError::EngineUnavailable(_)));
        assert!(!registry.is_built());
        assert_eq!(registry.build_count(), 0);

        assert!(registry.get(ImageFormat::Png).unwrap().is_some());
        assert_eq!(registry.build_count(), 1);
        assert_eq!(engine.created.load(Ordering::SeqCst), engine.disposed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_argument_errors_precede_build() {
        let engine = Arc::new(ScriptedEngine::new(vec![], 0));
        let registry = FormatRegistry::new(engine);

        let err = registry.get_by_header(&[]).unwrap_err();
        assert!(matches!(err, IoError::InvalidArgument { name: "data", .. }));
        assert!(registry.get_by_extension("").unwrap_err().is_invalid_argument());
        assert!(registry.get_by_extension("notes.txt").unwrap().is_none());
        assert!(!registry.is_built());
    }

    #[test]
    fn test_unregister_seen_by_all_lookups() {
        let engine = Arc::new(ScriptedEngine::new(vec![record("PNG", "PNG", "png")], 0));
        let registry = FormatRegistry::new(engine);

        assert!(registry.get_by_header(b"PNG....").unwrap().is_some());
        assert!(registry.unregister(ImageFormat::Png).unwrap());
        assert!(!registry.unregister(ImageFormat::Png).unwrap());

        assert!(registry.get(ImageFormat::Png).unwrap().is_none());
        assert!(registry.get_by_extension("a.png").unwrap().is_none());
        assert!(registry.get_by_header(b"PNG....").unwrap().is_none());
        assert!(!registry.supports_extension("png"));
    }

    #[test]
    fn test_all_is_sorted() {
        let engine = Arc::new(ScriptedEngine::new(
            vec![record("WEBP", "WEBP", "w"), record("BMP", "BMP", "b"), record("PNG", "PNG", "p")],
            0,
        ));
        let registry = FormatRegistry::new(engine);
        let formats: Vec<_> = registry.all().unwrap().iter().map(|d| d.format()).collect();
        let mut sorted = formats.clone();
        sorted.sort();
        assert_eq!(formats, sorted);
        assert_eq!(formats.len(), 5);
    }

    #[test]
    fn test_builtin_engine_catalog() {
        let engine = Arc::new(BuiltinEngine::new());
        let registry = FormatRegistry::new(engine.clone());

        let jpg = registry.get(ImageFormat::Jpg).unwrap().unwrap();
        assert_eq!(jpg.module_format(), ImageFormat::Jpeg);
        assert!(jpg.is_alias());
        assert!(registry.get(ImageFormat::ThreeFr).unwrap().is_some());
        assert!(registry.supports_extension(".PNG"));
        assert!(!registry.supports_extension("mpc"));
        assert_eq!(engine.outstanding_lists(), 0);
    }
}
