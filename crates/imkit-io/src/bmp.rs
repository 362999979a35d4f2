//! BMP header probing.
//!
//! Handles the OS/2 core header (12 bytes) and every Windows
//! `BITMAPINFOHEADER` revision (40 to 124 bytes). A negative height marks a
//! top-down bitmap and is reported as its absolute value.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use imkit_core::{ColorSpace, Compression, Density, ImageFormat};

use crate::info::{ImageInfo, truncated};
use crate::{IoError, IoResult};

const FORMAT: ImageFormat = ImageFormat::Bmp;

/// Size of the `BITMAPFILEHEADER`.
const FILE_HEADER_LEN: u64 = 14;

/// Probes a BMP header.
pub fn probe(data: &[u8]) -> IoResult<ImageInfo> {
    if !data.starts_with(b"BM") {
        return Err(IoError::corrupt(FORMAT, "bad signature"));
    }

    let mut cur = Cursor::new(data);
    cur.set_position(FILE_HEADER_LEN);
    let dib_len = cur.read_u32::<LittleEndian>().map_err(truncated(FORMAT))?;

    let (width, height, bpp, compression, density) = if dib_len == 12 {
        let width = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
        let height = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
        let _planes = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
        let bpp = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
        (i64::from(width), i64::from(height), bpp, 0, None)
    } else if dib_len >= 40 {
        let width = cur.read_i32::<LittleEndian>().map_err(truncated(FORMAT))?;
        let height = cur.read_i32::<LittleEndian>().map_err(truncated(FORMAT))?;
        let _planes = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
        let bpp = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
        let compression = cur.read_u32::<LittleEndian>().map_err(truncated(FORMAT))?;
        let _image_size = cur.read_u32::<LittleEndian>().map_err(truncated(FORMAT))?;
        let x_ppm = cur.read_i32::<LittleEndian>().map_err(truncated(FORMAT))?;
        let y_ppm = cur.read_i32::<LittleEndian>().map_err(truncated(FORMAT))?;
        let density = (x_ppm > 0 && y_ppm > 0)
            .then(|| Density::from_pixels_per_meter(x_ppm.unsigned_abs(), y_ppm.unsigned_abs()));
        (i64::from(width), i64::from(height), bpp, compression, density)
    } else {
        return Err(IoError::corrupt(FORMAT, format!("unsupported DIB header size {dib_len}")));
    };

    if width <= 0 || height == 0 {
        return Err(IoError::corrupt(FORMAT, "invalid dimensions"));
    }
    let width = u32::try_from(width).map_err(|_| IoError::corrupt(FORMAT, "width out of range"))?;
    let height = u32::try_from(height.unsigned_abs())
        .map_err(|_| IoError::corrupt(FORMAT, "height out of range"))?;

    let depth = match bpp {
        1 | 2 | 4 | 8 | 24 | 32 => 8,
        16 => 5,
        64 => 16,
        other => return Err(IoError::corrupt(FORMAT, format!("{other} bits per pixel"))),
    };

    let compression = match compression {
        0 | 3 | 6 => Compression::NoCompression,
        1 | 2 => Compression::Rle,
        4 => Compression::Jpeg,
        5 => Compression::Zip,
        other => return Err(IoError::corrupt(FORMAT, format!("compression {other}"))),
    };

    let mut info = ImageInfo::new(FORMAT, width, height, depth)
        .with_color_space(ColorSpace::Srgb)
        .with_compression(compression);
    info.density = density;
    Ok(info)
}
