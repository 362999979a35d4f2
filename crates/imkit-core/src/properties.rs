//! Image properties reported by header probing.
//!
//! These are plain value enums: what the file header *says*, not what a
//! decoder would produce.
//!
//! - [`ColorSpace`] - sample interpretation (sRGB, gray, CMYK, ...)
//! - [`Compression`] - storage compression method
//! - [`Interlace`] - progressive / interlaced layout
//! - [`Density`] - physical resolution with [`DensityUnit`]

use std::fmt;

/// Color space of stored samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    /// Not stated by the header.
    #[default]
    Undefined,
    /// Non-linear sRGB.
    Srgb,
    /// Linear RGB.
    LinearRgb,
    /// Single gray channel.
    Gray,
    /// Cyan, magenta, yellow, black.
    Cmyk,
    /// Luma plus two chroma channels.
    YCbCr,
    /// CIE L*a*b*.
    Lab,
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "Undefined",
            Self::Srgb => "sRGB",
            Self::LinearRgb => "RGB",
            Self::Gray => "Gray",
            Self::Cmyk => "CMYK",
            Self::YCbCr => "YCbCr",
            Self::Lab => "Lab",
        };
        f.write_str(name)
    }
}

/// Compression method of the stored pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// Not stated by the header.
    #[default]
    Undefined,
    /// Uncompressed.
    NoCompression,
    /// Run-length encoding.
    Rle,
    /// Lempel-Ziv-Welch.
    Lzw,
    /// Deflate.
    Zip,
    /// Baseline or progressive DCT JPEG.
    Jpeg,
    /// Lossless JPEG (SOF3).
    LosslessJpeg,
    /// CCITT Group 3 fax.
    Group3,
    /// CCITT Group 4 fax.
    Group4,
    /// WebP lossy (VP8).
    WebP,
    /// WebP lossless (VP8L).
    WebPLossless,
    /// QOI operations stream.
    Qoi,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "Undefined",
            Self::NoCompression => "None",
            Self::Rle => "RLE",
            Self::Lzw => "LZW",
            Self::Zip => "Zip",
            Self::Jpeg => "JPEG",
            Self::LosslessJpeg => "LosslessJPEG",
            Self::Group3 => "Group3",
            Self::Group4 => "Group4",
            Self::WebP => "WebP",
            Self::WebPLossless => "WebPLossless",
            Self::Qoi => "QOI",
        };
        f.write_str(name)
    }
}

/// Interlace scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interlace {
    /// Not stated by the header.
    #[default]
    Undefined,
    /// Sequential scanlines.
    NoInterlace,
    /// GIF 4-pass interlace.
    Gif,
    /// Progressive JPEG.
    Jpeg,
    /// PNG Adam7.
    Png,
}

impl fmt::Display for Interlace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "Undefined",
            Self::NoInterlace => "None",
            Self::Gif => "GIF",
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
        };
        f.write_str(name)
    }
}

/// Unit of a [`Density`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DensityUnit {
    /// Aspect ratio only.
    #[default]
    Undefined,
    /// Pixels per inch.
    PixelsPerInch,
    /// Pixels per centimeter.
    PixelsPerCentimeter,
}

/// Physical resolution.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Density {
    /// Horizontal resolution.
    pub x: f64,
    /// Vertical resolution.
    pub y: f64,
    /// Unit of `x` and `y`.
    pub units: DensityUnit,
}

impl Density {
    /// Creates a density.
    pub fn new(x: f64, y: f64, units: DensityUnit) -> Self {
        Self { x, y, units }
    }

    /// Converts pixels-per-meter (PNG `pHYs`, BMP) to pixels-per-centimeter.
    pub fn from_pixels_per_meter(x: u32, y: u32) -> Self {
        Self::new(f64::from(x) / 100.0, f64::from(y) / 100.0, DensityUnit::PixelsPerCentimeter)
    }

    /// Returns the density expressed in pixels per inch.
    ///
    /// Undefined units are returned unchanged.
    pub fn to_ppi(self) -> Self {
        match self.units {
            DensityUnit::PixelsPerCentimeter => {
                Self::new(self.x * 2.54, self.y * 2.54, DensityUnit::PixelsPerInch)
            }
            _ => self,
        }
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.units {
            DensityUnit::Undefined => "",
            DensityUnit::PixelsPerInch => " ppi",
            DensityUnit::PixelsPerCentimeter => " ppcm",
        };
        write!(f, "{}x{}{}", self.x, self.y, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_density_from_ppm() {
        // 2835 px/m is the usual 72 dpi
        let d = Density::from_pixels_per_meter(2835, 2835);
        assert_eq!(d.units, DensityUnit::PixelsPerCentimeter);
        let ppi = d.to_ppi();
        assert_relative_eq!(ppi.x, 72.009, epsilon = 1e-3);
        assert_eq!(ppi.units, DensityUnit::PixelsPerInch);
    }

    #[test]
    fn test_display() {
        assert_eq!(Density::new(72.0, 72.0, DensityUnit::PixelsPerInch).to_string(), "72x72 ppi");
        assert_eq!(ColorSpace::Srgb.to_string(), "sRGB");
        assert_eq!(Compression::NoCompression.to_string(), "None");
        assert_eq!(Interlace::Png.to_string(), "PNG");
    }
}
