//! QOI header probing.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use imkit_core::{ColorSpace, Compression, ImageFormat};

use crate::info::{ImageInfo, truncated};
use crate::{IoError, IoResult};

const FORMAT: ImageFormat = ImageFormat::Qoi;

/// Probes a QOI header.
pub fn probe(data: &[u8]) -> IoResult<ImageInfo> {
    if !data.starts_with(b"qoif") {
        return Err(IoError::corrupt(FORMAT, "bad signature"));
    }
    let mut cur = Cursor::new(data);
    cur.set_position(4);

    let width = cur.read_u32::<BigEndian>().map_err(truncated(FORMAT))?;
    let height = cur.read_u32::<BigEndian>().map_err(truncated(FORMAT))?;
    let channels = cur.read_u8().map_err(truncated(FORMAT))?;
    let colorspace = cur.read_u8().map_err(truncated(FORMAT))?;

    if width == 0 || height == 0 {
        return Err(IoError::corrupt(FORMAT, "zero dimension"));
    }
    if !matches!(channels, 3 | 4) {
        return Err(IoError::corrupt(FORMAT, format!("{channels} channels")));
    }
    let color_space = match colorspace {
        0 => ColorSpace::Srgb,
        1 => ColorSpace::LinearRgb,
        other => return Err(IoError::corrupt(FORMAT, format!("colorspace {other}"))),
    };

    Ok(ImageInfo::new(FORMAT, width, height, 8)
        .with_color_space(color_space)
        .with_compression(Compression::Qoi))
}
