//! Symbolic image format identifiers.
//!
//! [`ImageFormat`] is the closed set of identifiers the registry is keyed by.
//! Engines describe formats with free-form names (`"PNG"`, `"JPEG"`,
//! `"3FR"`, `"PNG-24"`); [`ImageFormat::from_raw_name`] is the single place
//! where those names are translated into identifiers.
//!
//! # Translation rules
//!
//! 1. Hyphens are stripped (`"PNG-24"` -> `"PNG24"`).
//! 2. Digit-leading names are remapped to a spellable alias:
//!    `3FR -> ThreeFr`, `3G2 -> ThreeG2`, `3GP -> ThreeGp`.
//! 3. The result is matched case-insensitively against the identifier
//!    spelling. Anything else becomes [`ImageFormat::Unknown`].
//!
//! File extensions go through the same translation, so `photo.3fr` resolves
//! to [`ImageFormat::ThreeFr`].
//!
//! ```rust
//! use imkit_core::ImageFormat;
//!
//! assert_eq!(ImageFormat::from_raw_name("PNG-24"), ImageFormat::Png24);
//! assert_eq!(ImageFormat::from_extension("raw/IMG_0001.3fr"), ImageFormat::ThreeFr);
//! assert_eq!(ImageFormat::from_extension("notes.txt2"), ImageFormat::Unknown);
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::CoreError;

/// Digit-leading engine names and the identifier spelling they map to.
const DIGIT_ALIASES: [(&str, &str); 3] = [("3FR", "ThreeFr"), ("3G2", "ThreeG2"), ("3GP", "ThreeGp")];

macro_rules! image_formats {
    ($($(#[$meta:meta])* $variant:ident),+ $(,)?) => {
        /// Image format identifier.
        ///
        /// Ordering follows declaration order; registry snapshots are
        /// sorted by it.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        #[non_exhaustive]
        pub enum ImageFormat {
            /// Unrecognized identifier. Never stored in a registry.
            #[default]
            Unknown,
            $($(#[$meta])* $variant,)+
        }

        impl ImageFormat {
            /// Every known identifier, excluding [`ImageFormat::Unknown`].
            pub const ALL: &'static [ImageFormat] = &[$(ImageFormat::$variant,)+];

            /// Identifier spelling, e.g. `"ThreeFr"`, `"WebP"`.
            pub const fn name(self) -> &'static str {
                match self {
                    ImageFormat::Unknown => "Unknown",
                    $(ImageFormat::$variant => stringify!($variant),)+
                }
            }
        }
    };
}

image_formats! {
    /// Hasselblad camera RAW.
    ThreeFr,
    /// Media container (3GPP2).
    ThreeG2,
    /// Media container (3GPP).
    ThreeGp,
    /// Animated Portable Network Graphics.
    APng,
    /// Sony Alpha RAW.
    Arw,
    /// AV1 Image File Format.
    Avif,
    /// Microsoft Windows bitmap.
    Bmp,
    /// Windows bitmap, version 2.
    Bmp2,
    /// Windows bitmap, version 3.
    Bmp3,
    /// Cineon image file.
    Cin,
    /// Raw cyan, magenta, yellow, black samples.
    Cmyk,
    /// Canon RAW, version 2.
    Cr2,
    /// Canon RAW, version 3.
    Cr3,
    /// Canon RAW.
    Crw,
    /// Windows cursor.
    Cur,
    /// DICOM medical image.
    Dcm,
    /// Kodak RAW.
    Dcr,
    /// DirectDraw Surface.
    Dds,
    /// Device independent bitmap.
    Dib,
    /// Adobe Digital Negative.
    Dng,
    /// SMPTE 268M-2003 (DPX 2.0).
    Dpx,
    /// Encapsulated Portable Document Format.
    Epdf,
    /// Encapsulated PostScript.
    Eps,
    /// Epson RAW.
    Erf,
    /// High dynamic-range (HDR) OpenEXR.
    Exr,
    /// Farbfeld.
    Farbfeld,
    /// Group 3 FAX.
    Fax,
    /// Flexible Image Transport System.
    Fits,
    /// CompuServe graphics interchange format.
    Gif,
    /// CompuServe graphics interchange format (version 87a).
    Gif87,
    /// Raw gray samples.
    Gray,
    /// Radiance RGBE image format.
    Hdr,
    /// High Efficiency Image Container.
    Heic,
    /// High Efficiency Image Format.
    Heif,
    /// Microsoft icon.
    Ico,
    /// JPEG-2000 code stream.
    J2c,
    /// JPEG-2000 code stream.
    J2k,
    /// JPEG Network Graphics.
    Jng,
    /// JPEG-2000 File Format Syntax.
    Jp2,
    /// Joint Photographic Experts Group JFIF format.
    Jpe,
    /// Joint Photographic Experts Group JFIF format.
    Jpeg,
    /// Joint Photographic Experts Group JFIF format.
    Jpg,
    /// JPEG XL.
    Jxl,
    /// Multiple-image Network Graphics.
    Mng,
    /// Sony (Minolta) RAW.
    Mrw,
    /// Nikon Digital SLR camera RAW.
    Nef,
    /// Nikon Digital SLR camera RAW.
    Nrw,
    /// Olympus Digital camera RAW.
    Orf,
    /// Common 2-dimensional bitmap format.
    Pam,
    /// Portable bitmap format (black and white).
    Pbm,
    /// ZSoft IBM PC Paintbrush.
    Pcx,
    /// Portable Document Format.
    Pdf,
    /// Pentax Electronic File.
    Pef,
    /// Portable float format.
    Pfm,
    /// Portable graymap format (gray scale).
    Pgm,
    /// Portable Network Graphics.
    Png,
    /// 8-bit indexed PNG.
    Png8,
    /// Opaque or binary transparent 24-bit RGB PNG.
    Png24,
    /// Opaque or transparent 32-bit RGBA PNG.
    Png32,
    /// Opaque or binary transparent 48-bit RGB PNG.
    Png48,
    /// Opaque or transparent 64-bit RGBA PNG.
    Png64,
    /// Portable anymap.
    Pnm,
    /// Portable pixmap format (color).
    Ppm,
    /// PostScript.
    Ps,
    /// Adobe Large Document Format.
    Psb,
    /// Adobe Photoshop bitmap.
    Psd,
    /// Pyramid encoded TIFF.
    Ptif,
    /// Quite OK image format.
    Qoi,
    /// Fuji CCD-RAW graphic file.
    Raf,
    /// Raw red, green, and blue samples.
    Rgb,
    /// Raw red, green, blue, and alpha samples.
    Rgba,
    /// Panasonic Lumix digital camera RAW.
    Rw2,
    /// Irix RGB image.
    Sgi,
    /// Sony RAW, version 2.
    Sr2,
    /// Scalable Vector Graphics.
    Svg,
    /// Compressed Scalable Vector Graphics.
    Svgz,
    /// Truevision Targa image.
    Tga,
    /// Tagged Image File Format.
    Tif,
    /// Tagged Image File Format.
    Tiff,
    /// Tagged Image File Format (64-bit offsets).
    Tiff64,
    /// Wireless bitmap (level 0) image.
    Wbmp,
    /// WebP image format.
    WebP,
    /// X Windows system bitmap (black and white).
    Xbm,
    /// GIMP image.
    Xcf,
    /// X Windows system pixmap (color).
    Xpm,
    /// Raw Y, Cb, and Cr samples.
    Ycbcr,
    /// CCIR 601 4:1:1 or 4:2:2.
    Yuv,
}

impl ImageFormat {
    /// Parses an identifier spelling, case-insensitively.
    ///
    /// Returns [`ImageFormat::Unknown`] when nothing matches. No hyphen
    /// stripping or alias remapping is done here; see [`Self::from_raw_name`].
    pub fn parse(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
            .unwrap_or(ImageFormat::Unknown)
    }

    /// Translates an engine-supplied format name into an identifier.
    ///
    /// Strips hyphens, remaps the digit-leading aliases, then parses.
    pub fn from_raw_name(raw: &str) -> Self {
        let stripped: String = raw.chars().filter(|&c| c != '-').collect();
        let name = DIGIT_ALIASES
            .iter()
            .find(|(digit, _)| digit.eq_ignore_ascii_case(&stripped))
            .map(|(_, alias)| *alias)
            .unwrap_or(stripped.as_str());

        Self::parse(name)
    }

    /// Derives an identifier from a file name's extension.
    ///
    /// A bare dotfile such as `.png` counts as extension `png`.
    ///
    /// Returns [`ImageFormat::Unknown`] for paths without an extension or
    /// with an extension that is not an identifier.
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        path.extension()
            .or_else(|| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .and_then(|name| name.strip_prefix('.'))
                    .map(std::ffi::OsStr::new)
            })
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(Self::from_raw_name)
            .unwrap_or(ImageFormat::Unknown)
    }

    /// Whether this is the [`ImageFormat::Unknown`] sentinel.
    #[inline]
    pub const fn is_unknown(self) -> bool {
        matches!(self, ImageFormat::Unknown)
    }

    /// The engine-side spelling of this identifier (upper case, digit aliases
    /// restored). Used when asking an engine about a format by name.
    pub fn engine_name(self) -> String {
        DIGIT_ALIASES
            .iter()
            .find(|(_, alias)| *alias == self.name())
            .map(|(digit, _)| (*digit).to_string())
            .unwrap_or_else(|| self.name().to_ascii_uppercase())
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFormat {
    type Err = CoreError;

    /// Parses with the same rules as [`ImageFormat::from_raw_name`] but
    /// rejects [`ImageFormat::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::from_raw_name(s.trim()) {
            ImageFormat::Unknown => Err(CoreError::parse("image format", s)),
            format => Ok(format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(ImageFormat::parse("png"), ImageFormat::Png);
        assert_eq!(ImageFormat::parse("PNG"), ImageFormat::Png);
        assert_eq!(ImageFormat::parse("webp"), ImageFormat::WebP);
        assert_eq!(ImageFormat::parse("nope"), ImageFormat::Unknown);
        // Unknown itself is not a parseable identifier
        assert_eq!(ImageFormat::parse("Unknown"), ImageFormat::Unknown);
    }

    #[test]
    fn test_raw_name_strips_hyphens() {
        assert_eq!(ImageFormat::from_raw_name("PNG-24"), ImageFormat::Png24);
        assert_eq!(ImageFormat::from_raw_name("-GIF-87-"), ImageFormat::Gif87);
    }

    #[test]
    fn test_digit_leading_aliases() {
        assert_eq!(ImageFormat::from_raw_name("3FR"), ImageFormat::ThreeFr);
        assert_eq!(ImageFormat::from_raw_name("3G2"), ImageFormat::ThreeG2);
        assert_eq!(ImageFormat::from_raw_name("3GP"), ImageFormat::ThreeGp);
        assert_eq!(ImageFormat::from_raw_name("3gp"), ImageFormat::ThreeGp);
        assert_eq!(ImageFormat::from_raw_name("3XX"), ImageFormat::Unknown);
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(ImageFormat::from_extension("a/b/photo.JPG"), ImageFormat::Jpg);
        assert_eq!(ImageFormat::from_extension("shot.3fr"), ImageFormat::ThreeFr);
        assert_eq!(ImageFormat::from_extension("archive.tar.gz"), ImageFormat::Unknown);
        assert_eq!(ImageFormat::from_extension("README"), ImageFormat::Unknown);
    }

    #[test]
    fn test_from_extension_dotfile() {
        assert_eq!(ImageFormat::from_extension(".png"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_extension("renders/.TIF"), ImageFormat::Tif);
        assert_eq!(ImageFormat::from_extension(".hidden.gif"), ImageFormat::Gif);
        assert_eq!(ImageFormat::from_extension(".bashrc"), ImageFormat::Unknown);
        assert_eq!(ImageFormat::from_extension("."), ImageFormat::Unknown);
    }

    #[test]
    fn test_engine_name() {
        assert_eq!(ImageFormat::ThreeFr.engine_name(), "3FR");
        assert_eq!(ImageFormat::WebP.engine_name(), "WEBP");
        assert_eq!(ImageFormat::Tif.engine_name(), "TIF");
    }

    #[test]
    fn test_all_is_sorted_and_unique() {
        let mut sorted = ImageFormat::ALL.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.as_slice(), ImageFormat::ALL);
        assert!(!ImageFormat::ALL.contains(&ImageFormat::Unknown));
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert_eq!("jpeg".parse::<ImageFormat>(), Ok(ImageFormat::Jpeg));
        assert!("unknown".parse::<ImageFormat>().is_err());
        assert!("".parse::<ImageFormat>().is_err());
    }
}
