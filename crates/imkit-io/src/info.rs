//! Header-only image inspection ("ping").
//!
//! [`ImageInfo`] reports what an image header says without decoding any
//! pixels: dimensions, stored depth, color space, compression, density,
//! interlace and frame count.
//!
//! The format is identified through [`FormatRegistry::global`], so a format
//! removed with [`FormatRegistry::unregister`] is no longer probed. Files
//! whose header is not recognized fall back to their extension.
//!
//! Every result is checked against [`ResourceLimits::global`]: dimensions
//! against width, height and area, frame counts against list length.
//!
//! # Example
//!
//! ```rust
//! use imkit_core::ImageFormat;
//! use imkit_io::ImageInfo;
//!
//! let qoi = [b'q', b'o', b'i', b'f', 0, 0, 0, 4, 0, 0, 0, 2, 4, 0];
//! let info = ImageInfo::from_bytes(&qoi).unwrap();
//! assert_eq!(info.format, ImageFormat::Qoi);
//! assert_eq!((info.width, info.height), (4, 2));
//! ```

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use imkit_core::{ColorSpace, Compression, Density, ImageFormat, Interlace, QuantumDepth};
use tracing::{debug, trace};

use crate::limits::ResourceLimits;
use crate::registry::FormatRegistry;
use crate::{IoError, IoResult};

/// Bytes read from a file for single-frame probing.
pub const PROBE_LEN: u64 = 1024 * 1024;

/// Header properties of one image or frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// Identified format.
    pub format: ImageFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bits per channel as stored in the file.
    pub depth: u32,
    /// Color space of stored samples.
    pub color_space: ColorSpace,
    /// Compression method.
    pub compression: Compression,
    /// Physical resolution, when the header carries one.
    pub density: Option<Density>,
    /// Interlace scheme.
    pub interlace: Interlace,
    /// Estimated encoder quality (JPEG only).
    pub quality: Option<u32>,
    /// Number of frames in the file.
    pub frame_count: usize,
    /// Source file, when read from disk.
    pub file_name: Option<PathBuf>,
}

impl ImageInfo {
    /// Creates an info with everything but the geometry undefined.
    pub fn new(format: ImageFormat, width: u32, height: u32, depth: u32) -> Self {
        Self {
            format,
            width,
            height,
            depth,
            color_space: ColorSpace::Undefined,
            compression: Compression::Undefined,
            density: None,
            interlace: Interlace::NoInterlace,
            quality: None,
            frame_count: 1,
            file_name: None,
        }
    }

    pub(crate) fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    pub(crate) fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Probes an in-memory image.
    pub fn from_bytes(data: &[u8]) -> IoResult<Self> {
        let format = identify(data)?;
        let info = probe(format, data)?;
        check_limits(&info)?;
        Ok(info)
    }

    /// Probes every frame of an in-memory image.
    ///
    /// Single-frame formats return one element.
    pub fn read_collection(data: &[u8]) -> IoResult<Vec<Self>> {
        let format = identify(data)?;
        let frames = probe_frames(format, data)?;
        ResourceLimits::global().check_list_length(frames.len() as u64)?;
        for frame in &frames {
            check_limits(frame)?;
        }
        Ok(frames)
    }

    /// Probes an image file.
    ///
    /// Reads a bounded prefix for single-frame formats and the whole file
    /// for multi-frame ones.
    pub fn read<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let path = path.as_ref();
        let mut header = Vec::new();
        File::open(path)?.take(PROBE_LEN).read_to_end(&mut header)?;
        if header.is_empty() {
            return Err(IoError::UnsupportedFormat(format!("{}: empty file", path.display())));
        }

        let format = match identify(&header) {
            Ok(format) => format,
            Err(IoError::UnsupportedFormat(_)) => {
                let Some(descriptor) = FormatRegistry::global().get_by_extension(path)? else {
                    return Err(IoError::UnsupportedFormat(path.display().to_string()));
                };
                debug!(path = %path.display(), format = %descriptor.format(), "header not recognized, using extension");
                descriptor.format()
            }
            Err(e) => return Err(e),
        };

        let mut info = if is_multi_frame(format) && header.len() as u64 == PROBE_LEN {
            let len = std::fs::metadata(path)?.len();
            ResourceLimits::global().check_memory_request(len)?;
            probe(format, &std::fs::read(path)?)?
        } else {
            probe(format, &header)?
        };
        check_limits(&info)?;
        info.file_name = Some(path.to_path_buf());
        Ok(info)
    }

    /// Depth the pixel store keeps for this image under the compiled
    /// quantum.
    pub fn effective_depth(&self) -> u32 {
        QuantumDepth::CURRENT.effective_depth(self.depth)
    }

    /// Number of pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.file_name {
            write!(f, "{} ", name.display())?;
        }
        write!(
            f,
            "{} {}x{} {}-bit {}",
            self.format.engine_name(),
            self.width,
            self.height,
            self.depth,
            self.color_space
        )?;
        if self.frame_count > 1 {
            write!(f, " {} frames", self.frame_count)?;
        }
        Ok(())
    }
}

/// Maps an I/O error from a header cursor to a truncation error.
pub(crate) fn truncated(format: ImageFormat) -> impl FnOnce(std::io::Error) -> IoError {
    move |_| IoError::corrupt(format, "truncated header")
}

fn identify(data: &[u8]) -> IoResult<ImageFormat> {
    match FormatRegistry::global().get_by_header(data)? {
        Some(descriptor) => {
            trace!(format = %descriptor.format(), "identified header");
            Ok(descriptor.format())
        }
        None => Err(IoError::UnsupportedFormat("unrecognized header".into())),
    }
}

fn is_multi_frame(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Gif | ImageFormat::Gif87 | ImageFormat::Tiff | ImageFormat::Tif)
}

fn check_limits(info: &ImageInfo) -> IoResult<()> {
    let limits = ResourceLimits::global();
    limits.check_dimensions(u64::from(info.width), u64::from(info.height))?;
    limits.check_list_length(info.frame_count as u64)
}

fn probe(format: ImageFormat, data: &[u8]) -> IoResult<ImageInfo> {
    match format {
        #[cfg(feature = "png")]
        ImageFormat::Png => crate::png::probe(data),
        #[cfg(feature = "gif")]
        ImageFormat::Gif | ImageFormat::Gif87 => crate::gif::probe(data),
        #[cfg(feature = "jpeg")]
        ImageFormat::Jpeg | ImageFormat::Jpg | ImageFormat::Jpe => crate::jpeg::probe(data),
        #[cfg(feature = "bmp")]
        ImageFormat::Bmp | ImageFormat::Bmp2 | ImageFormat::Bmp3 | ImageFormat::Dib => {
            crate::bmp::probe(data)
        }
        #[cfg(feature = "tiff")]
        ImageFormat::Tiff | ImageFormat::Tif => crate::tiff::probe(data),
        #[cfg(feature = "webp")]
        ImageFormat::WebP => crate::webp::probe(data),
        #[cfg(feature = "pnm")]
        ImageFormat::Pbm
        | ImageFormat::Pgm
        | ImageFormat::Ppm
        | ImageFormat::Pnm
        | ImageFormat::Pam
        | ImageFormat::Pfm => crate::pnm::probe(data),
        #[cfg(feature = "qoi")]
        ImageFormat::Qoi => crate::qoi::probe(data),
        other => Err(IoError::UnsupportedFormat(format!(
            "no header prober for {other}"
        ))),
    }
}

fn probe_frames(format: ImageFormat, data: &[u8]) -> IoResult<Vec<ImageInfo>> {
    match format {
        #[cfg(feature = "gif")]
        ImageFormat::Gif | ImageFormat::Gif87 => crate::gif::probe_frames(data),
        #[cfg(feature = "tiff")]
        ImageFormat::Tiff | ImageFormat::Tif => crate::tiff::probe_frames(data),
        _ => probe(format, data).map(|info| vec![info]),
    }
}

/// Names of the header probers compiled into this build.
pub fn probers() -> Vec<&'static str> {
    let mut names = Vec::new();
    if cfg!(feature = "bmp") {
        names.push("bmp");
    }
    if cfg!(feature = "gif") {
        names.push("gif");
    }
    if cfg!(feature = "jpeg") {
        names.push("jpeg");
    }
    if cfg!(feature = "png") {
        names.push("png");
    }
    if cfg!(feature = "pnm") {
        names.push("pnm");
    }
    if cfg!(feature = "qoi") {
        names.push("qoi");
    }
    if cfg!(feature = "tiff") {
        names.push("tiff");
    }
    if cfg!(feature = "webp") {
        names.push("webp");
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_data_is_argument_error() {
        let err = ImageInfo::from_bytes(&[]).unwrap_err();
        assert!(matches!(err, IoError::InvalidArgument { name: "data", .. }));
    }

    #[test]
    fn test_unrecognized_header() {
        let err = ImageInfo::from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_recognized_without_prober() {
        let err = ImageInfo::from_bytes(&[0x76, 0x2F, 0x31, 0x01, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFormat(msg) if msg.contains("Exr")));
    }

    #[test]
    fn test_display() {
        let mut info = ImageInfo::new(ImageFormat::Png, 640, 480, 8)
            .with_color_space(ColorSpace::Srgb);
        assert_eq!(info.to_string(), "PNG 640x480 8-bit sRGB");
        info.file_name = Some(PathBuf::from("a.png"));
        info.frame_count = 3;
        assert_eq!(info.to_string(), "a.png PNG 640x480 8-bit sRGB 3 frames");
    }

    #[test]
    fn test_effective_depth_follows_quantum() {
        let info = ImageInfo::new(ImageFormat::Pfm, 1, 1, 32);
        let expected = if QuantumDepth::CURRENT.is_hdri() {
            32
        } else {
            QuantumDepth::CURRENT.bits()
        };
        assert_eq!(info.effective_depth(), expected);
        assert_eq!(ImageInfo::new(ImageFormat::Pbm, 1, 1, 1).effective_depth(), 1);
    }

    #[test]
    fn test_probers_listed() {
        let names = probers();
        assert!(names.windows(2).all(|w| w[0] < w[1]));
        #[cfg(feature = "png")]
        assert!(names.contains(&"png"));
    }
}
