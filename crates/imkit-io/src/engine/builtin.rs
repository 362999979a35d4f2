//! Built-in format engine backed by a static table.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::{FormatEngine, RawFormatList, RawFormatRecord};
use crate::IoResult;
use crate::detect;

const R: u8 = 0b0_0001;
const W: u8 = 0b0_0010;
const M: u8 = 0b0_0100;
const RT: u8 = 0b0_1000;
const WT: u8 = 0b1_0000;
const RW: u8 = R | W | RT | WT;

struct Entry {
    name: &'static str,
    module: &'static str,
    description: &'static str,
    mime: Option<&'static str>,
    flags: u8,
}

const fn entry(
    name: &'static str,
    module: &'static str,
    description: &'static str,
    mime: Option<&'static str>,
    flags: u8,
) -> Entry {
    Entry {
        name,
        module,
        description,
        mime,
        flags,
    }
}

impl Entry {
    fn record(&self) -> RawFormatRecord {
        RawFormatRecord {
            name: self.name.to_string(),
            module: Some(self.module.to_string()),
            description: Some(self.description.to_string()),
            mime_type: self.mime.map(str::to_string),
            can_read: self.flags & R != 0,
            can_write: self.flags & W != 0,
            multi_frame: self.flags & M != 0,
            read_multithreaded: self.flags & RT != 0,
            write_multithreaded: self.flags & WT != 0,
        }
    }
}

/// Primary enumeration, in engine order.
///
/// `MPC`, `NULL`, `XC` and `INFO` have no identifier and are dropped by the
/// registry during translation.
static FORMATS: &[Entry] = &[
    entry("3FR", "DNG", "Hasselblad CFV/H3D39II Raw Format", None, R | RT),
    entry("3G2", "VIDEO", "Media Container", Some("video/3gpp2"), R | M),
    entry("3GP", "VIDEO", "Media Container", Some("video/3gpp"), R | M),
    entry("APNG", "VIDEO", "Animated Portable Network Graphics", Some("image/apng"), R | M),
    entry("ARW", "DNG", "Sony Alpha Raw Image Format", None, R | RT),
    entry("AVIF", "HEIC", "AV1 Image File Format", Some("image/avif"), R | W),
    entry("BMP", "BMP", "Microsoft Windows bitmap image", Some("image/bmp"), RW),
    entry("BMP2", "BMP", "Microsoft Windows bitmap image (V2)", Some("image/bmp"), RW),
    entry("BMP3", "BMP", "Microsoft Windows bitmap image (V3)", Some("image/bmp"), RW),
    entry("CIN", "CIN", "Cineon Image File", Some("image/cineon"), RW),
    entry("CMYK", "CMYK", "Raw cyan, magenta, yellow, and black samples", None, RW),
    entry("CR2", "DNG", "Canon Digital Camera Raw Image Format", Some("image/x-canon-cr2"), R | RT),
    entry("CR3", "DNG", "Canon Digital Camera Raw Image Format", Some("image/x-canon-cr3"), R | RT),
    entry("CRW", "DNG", "Canon Digital Camera Raw Image Format", Some("image/x-canon-crw"), R | RT),
    entry("CUR", "ICON", "Microsoft icon", None, R | W | M),
    entry("DCM", "DCM", "Digital Imaging and Communications in Medicine image", Some("application/dicom"), R | M),
    entry("DCR", "DNG", "Kodak Digital Camera Raw Image File", Some("image/x-kodak-dcr"), R | RT),
    entry("DDS", "DDS", "Microsoft DirectDraw Surface", Some("image/vnd-ms.dds"), RW),
    entry("DNG", "DNG", "Digital Negative", Some("image/x-adobe-dng"), R | RT),
    entry("DPX", "DPX", "SMPTE 268M-2003 (DPX 2.0)", Some("image/dpx"), RW),
    entry("EPDF", "PDF", "Encapsulated Portable Document Format", Some("application/pdf"), R | W | M),
    entry("EPS", "PS", "Encapsulated PostScript", Some("application/postscript"), R | W),
    entry("ERF", "DNG", "Epson RAW Format", Some("image/x-epson-erf"), R | RT),
    entry("EXR", "EXR", "High Dynamic-range (HDR)", Some("image/x-exr"), R | W | RT),
    entry("FARBFELD", "FARBFELD", "Farbfeld", Some("image/x-farbfeld"), RW),
    entry("FAX", "FAX", "Group 3 FAX", Some("image/g3fax"), RW),
    entry("FITS", "FITS", "Flexible Image Transport System", Some("image/fits"), R | W | M),
    entry("GIF", "GIF", "CompuServe graphics interchange format", Some("image/gif"), R | W | M | RT | WT),
    entry("GIF87", "GIF", "CompuServe graphics interchange format (version 87a)", Some("image/gif"), RW),
    entry("GRAY", "GRAY", "Raw gray samples", None, R | W | M | RT | WT),
    entry("HDR", "HDR", "Radiance RGBE image format", Some("image/vnd.radiance"), RW),
    entry("HEIC", "HEIC", "High Efficiency Image Format", Some("image/heic"), R | W),
    entry("HEIF", "HEIC", "High Efficiency Image Format", Some("image/heif"), R | W),
    entry("ICO", "ICON", "Microsoft icon", Some("image/vnd.microsoft.icon"), R | W | M),
    entry("INFO", "INFO", "The image format and characteristics", None, W | M),
    entry("J2C", "JP2", "JPEG-2000 Code Stream Syntax", Some("image/jp2"), RW),
    entry("J2K", "JP2", "JPEG-2000 Code Stream Syntax", Some("image/jp2"), RW),
    entry("JNG", "PNG", "JPEG Network Graphics", Some("image/x-jng"), RW),
    entry("JP2", "JP2", "JPEG-2000 File Format Syntax", Some("image/jp2"), RW),
    entry("JPE", "JPEG", "Joint Photographic Experts Group JFIF format", Some("image/jpeg"), RW),
    entry("JPEG", "JPEG", "Joint Photographic Experts Group JFIF format", Some("image/jpeg"), RW),
    entry("JPG", "JPEG", "Joint Photographic Experts Group JFIF format", Some("image/jpeg"), RW),
    entry("JXL", "JXL", "JPEG XL (ISO/IEC 18181)", Some("image/jxl"), RW),
    entry("MNG", "PNG", "Multiple-image Network Graphics", Some("video/x-mng"), R | W | M | RT | WT),
    entry("MPC", "MPC", "Persistent pixel cache image format", None, RW),
    entry("MRW", "DNG", "Sony (Minolta) Raw Image File", Some("image/x-minolta-mrw"), R | RT),
    entry("NEF", "DNG", "Nikon Digital SLR Camera Raw Image File", Some("image/x-nikon-nef"), R | RT),
    entry("NRW", "DNG", "Nikon Digital SLR Camera Raw Image File", None, R | RT),
    entry("NULL", "NULL", "Constant image of uniform color", None, RW),
    entry("ORF", "DNG", "Olympus Digital Camera Raw Image File", Some("image/x-olympus-orf"), R | RT),
    entry("PAM", "PNM", "Common 2-dimensional bitmap format", Some("image/x-portable-anymap"), R | W | M | RT | WT),
    entry("PBM", "PNM", "Portable bitmap format (black and white)", Some("image/x-portable-bitmap"), R | W | M | RT | WT),
    entry("PCX", "PCX", "ZSoft IBM PC Paintbrush", Some("image/x-pcx"), RW),
    entry("PDF", "PDF", "Portable Document Format", Some("application/pdf"), R | W | M),
    entry("PEF", "DNG", "Pentax Electronic File", Some("image/x-pentax-pef"), R | RT),
    entry("PFM", "PNM", "Portable float format", Some("image/x-portable-floatmap"), R | W | M | RT | WT),
    entry("PGM", "PNM", "Portable graymap format (gray scale)", Some("image/x-portable-greymap"), R | W | M | RT | WT),
    entry("PNG", "PNG", "Portable Network Graphics", Some("image/png"), RW),
    entry("PNG8", "PNG", "8-bit indexed with optional binary transparency", Some("image/png"), RW),
    entry("PNG24", "PNG", "opaque or binary transparent 24-bit RGB", Some("image/png"), RW),
    entry("PNG32", "PNG", "opaque or transparent 32-bit RGBA", Some("image/png"), RW),
    entry("PNG48", "PNG", "opaque or binary transparent 48-bit RGB", Some("image/png"), RW),
    entry("PNG64", "PNG", "opaque or transparent 64-bit RGBA", Some("image/png"), RW),
    entry("PNM", "PNM", "Portable anymap", Some("image/x-portable-anymap"), R | W | M | RT | WT),
    entry("PPM", "PNM", "Portable pixmap format (color)", Some("image/x-portable-pixmap"), R | W | M | RT | WT),
    entry("PS", "PS", "PostScript", Some("application/postscript"), R | W | M),
    entry("PSB", "PSD", "Adobe Large Document Format", Some("image/vnd.adobe.photoshop"), RW),
    entry("PSD", "PSD", "Adobe Photoshop bitmap", Some("image/vnd.adobe.photoshop"), RW),
    entry("PTIF", "TIFF", "Pyramid encoded TIFF", Some("image/tiff"), R | W | M),
    entry("QOI", "QOI", "Quite OK image format", Some("image/qoi"), RW),
    entry("RAF", "DNG", "Fuji CCD-RAW Graphic File", Some("image/x-fuji-raf"), R | RT),
    entry("RGB", "RGB", "Raw red, green, and blue samples", None, R | W | M | RT | WT),
    entry("RGBA", "RGB", "Raw red, green, blue, and alpha samples", None, R | W | M | RT | WT),
    entry("RW2", "DNG", "Panasonic Lumix Raw Image", Some("image/x-panasonic-rw2"), R | RT),
    entry("SGI", "SGI", "Irix RGB image", Some("image/x-sgi"), RW),
    entry("SR2", "DNG", "Sony Raw Format 2", Some("image/x-sony-sr2"), R | RT),
    entry("SVG", "SVG", "Scalable Vector Graphics", Some("image/svg+xml"), R | W),
    entry("SVGZ", "SVG", "Compressed Scalable Vector Graphics", Some("image/svg+xml"), R | W),
    entry("TGA", "TGA", "Truevision Targa image", Some("image/x-tga"), RW),
    entry("TIFF", "TIFF", "Tagged Image File Format", Some("image/tiff"), R | W | M),
    entry("TIFF64", "TIFF", "Tagged Image File Format (64-bit)", Some("image/tiff"), R | W | M),
    entry("WBMP", "WBMP", "Wireless Bitmap (level 0) image", Some("image/vnd.wap.wbmp"), RW),
    entry("WEBP", "WEBP", "WebP Image Format", Some("image/webp"), R | W | M),
    entry("XBM", "XBM", "X Windows system bitmap (black and white)", Some("image/x-xbitmap"), RW),
    entry("XC", "XC", "Constant image uniform color", None, R | RT),
    entry("XCF", "XCF", "GIMP image", Some("image/x-xcf"), R | RT),
    entry("XPM", "XPM", "X Windows system pixmap (color)", Some("image/x-xpixmap"), RW),
    entry("YCbCr", "YCbCr", "Raw Y, Cb, and Cr samples", None, R | W | M | RT | WT),
    entry("YUV", "YUV", "CCIR 601 4:1:1 or 4:2:2", None, RW),
];

/// Formats resolvable by name only.
static STEALTH: &[Entry] = &[
    entry("DIB", "BMP", "Microsoft Windows 3.X Packed Device-Independent Bitmap", Some("image/bmp"), RW),
    entry("TIF", "TIFF", "Tagged Image File Format", Some("image/tiff"), R | W | M),
];

/// Engine over the compiled-in format table and [`detect::sniff`].
#[derive(Debug, Default)]
pub struct BuiltinEngine {
    next_id: AtomicU64,
    outstanding: Mutex<HashSet<u64>>,
}

impl BuiltinEngine {
    /// Creates an engine with no outstanding lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lists handed out and not yet disposed.
    pub fn outstanding_lists(&self) -> usize {
        self.outstanding.lock().map_or(0, |set| set.len())
    }

    fn is_live(&self, list: &RawFormatList) -> bool {
        self.outstanding
            .lock()
            .map(|set| set.contains(&list.id()))
            .unwrap_or(false)
    }
}

impl FormatEngine for BuiltinEngine {
    fn create_list(&self) -> IoResult<RawFormatList> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut set) = self.outstanding.lock() {
            set.insert(id);
        }
        trace!(id, len = FORMATS.len(), "created format list");
        Ok(RawFormatList::new(id, FORMATS.len()))
    }

    fn record_at(&self, list: &RawFormatList, index: usize) -> Option<RawFormatRecord> {
        if !self.is_live(list) || index >= list.len() {
            return None;
        }
        FORMATS.get(index).map(Entry::record)
    }

    fn dispose_list(&self, list: RawFormatList) {
        if let Ok(mut set) = self.outstanding.lock() {
            set.remove(&list.id());
        }
        trace!(id = list.id(), "disposed format list");
    }

    fn describe_by_name(&self, name: &str) -> Option<RawFormatRecord> {
        FORMATS
            .iter()
            .chain(STEALTH)
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(Entry::record)
    }

    fn sniff_header(&self, header: &[u8]) -> Option<RawFormatRecord> {
        let name = detect::sniff(header)?;
        trace!(name, "sniffed header");
        self.describe_by_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imkit_core::ImageFormat;

    #[test]
    fn test_every_listed_name_is_unique() {
        let mut seen = HashSet::new();
        for e in FORMATS.iter().chain(STEALTH) {
            assert!(seen.insert(e.name.to_ascii_uppercase()), "duplicate {}", e.name);
        }
    }

    #[test]
    fn test_stealth_not_enumerated() {
        let engine = BuiltinEngine::new();
        let list = engine.create_list().unwrap();
        let names: Vec<String> = (0..list.len())
            .filter_map(|i| engine.record_at(&list, i))
            .map(|r| r.name)
            .collect();
        engine.dispose_list(list);

        assert!(names.iter().any(|n| n == "BMP"));
        assert!(!names.iter().any(|n| n == "DIB" || n == "TIF"));
        assert!(engine.describe_by_name("dib").is_some());
        assert!(engine.describe_by_name("TIF").is_some());
    }

    #[test]
    fn test_disposed_list_yields_nothing() {
        let engine = BuiltinEngine::new();
        let list = engine.create_list().unwrap();
        let stale = RawFormatList::new(list.id(), list.len());
        engine.dispose_list(list);
        assert!(engine.record_at(&stale, 0).is_none());
        assert_eq!(engine.outstanding_lists(), 0);
    }

    #[test]
    fn test_out_of_range_index() {
        let engine = BuiltinEngine::new();
        let list = engine.create_list().unwrap();
        assert!(engine.record_at(&list, list.len()).is_none());
        engine.dispose_list(list);
    }

    #[test]
    fn test_sniff_resolves_record() {
        let engine = BuiltinEngine::new();
        let record = engine.sniff_header(b"GIF89a\x01\x00\x01\x00").unwrap();
        assert_eq!(record.name, "GIF");
        assert!(record.multi_frame);
        assert!(engine.sniff_header(b"plain text").is_none());
    }

    #[test]
    fn test_every_sniffed_name_is_described() {
        let names = [
            "PNG", "MNG", "JNG", "JPEG", "GIF", "TIFF", "TIFF64", "WEBP", "AVIF", "HEIC", "HEIF",
            "3GP", "3G2", "CR3", "JP2", "J2K", "JXL", "EXR", "DPX", "CIN", "QOI", "DDS", "PDF",
            "ICO", "CUR", "PSD", "PSB", "FARBFELD", "XCF", "FITS", "PS", "HDR", "DCM", "SGI",
            "BMP", "PBM", "PGM", "PPM", "PAM", "PFM", "SVG",
        ];
        let engine = BuiltinEngine::new();
        for name in names {
            let record = engine.describe_by_name(name).unwrap();
            assert!(!ImageFormat::from_raw_name(&record.name).is_unknown(), "{name}");
        }
    }
}
