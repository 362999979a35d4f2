//! PNG header probing.
//!
//! Reads `IHDR`, then walks the chunks before the first `IDAT` for `pHYs`
//! (density) and `acTL` (animation frame count). Chunk CRCs are not
//! verified.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use imkit_core::{ColorSpace, Compression, Density, ImageFormat, Interlace};

use crate::info::{ImageInfo, truncated};
use crate::{IoError, IoResult};

/// PNG signature.
pub const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

const FORMAT: ImageFormat = ImageFormat::Png;

/// Probes a PNG header.
pub fn probe(data: &[u8]) -> IoResult<ImageInfo> {
    if !data.starts_with(&SIGNATURE) {
        return Err(IoError::corrupt(FORMAT, "bad signature"));
    }

    let mut cur = Cursor::new(data);
    cur.set_position(SIGNATURE.len() as u64);

    let (len, kind) = read_chunk_header(&mut cur)?;
    if &kind != b"IHDR" || len != 13 {
        return Err(IoError::corrupt(FORMAT, "first chunk is not IHDR"));
    }

    let width = cur.read_u32::<BigEndian>().map_err(truncated(FORMAT))?;
    let height = cur.read_u32::<BigEndian>().map_err(truncated(FORMAT))?;
    let bit_depth = cur.read_u8().map_err(truncated(FORMAT))?;
    let color_type = cur.read_u8().map_err(truncated(FORMAT))?;
    let _compression = cur.read_u8().map_err(truncated(FORMAT))?;
    let _filter = cur.read_u8().map_err(truncated(FORMAT))?;
    let interlace = cur.read_u8().map_err(truncated(FORMAT))?;
    let _crc = cur.read_u32::<BigEndian>().map_err(truncated(FORMAT))?;

    if width == 0 || height == 0 {
        return Err(IoError::corrupt(FORMAT, "zero dimension"));
    }

    let color_space = match (color_type, bit_depth) {
        (0, 1 | 2 | 4 | 8 | 16) | (4, 8 | 16) => ColorSpace::Gray,
        (2 | 6, 8 | 16) | (3, 1 | 2 | 4 | 8) => ColorSpace::Srgb,
        _ => {
            return Err(IoError::corrupt(
                FORMAT,
                format!("invalid color type {color_type} with bit depth {bit_depth}"),
            ));
        }
    };
    // Palette entries are 8-bit regardless of the index width.
    let depth = if color_type == 3 { 8 } else { u32::from(bit_depth) };

    let mut info = ImageInfo::new(FORMAT, width, height, depth)
        .with_color_space(color_space)
        .with_compression(Compression::Zip);
    info.interlace = if interlace == 1 {
        Interlace::Png
    } else {
        Interlace::NoInterlace
    };

    scan_ancillary(&mut cur, &mut info);
    Ok(info)
}

fn read_chunk_header(cur: &mut Cursor<&[u8]>) -> IoResult<(u32, [u8; 4])> {
    let len = cur.read_u32::<BigEndian>().map_err(truncated(FORMAT))?;
    let mut kind = [0u8; 4];
    cur.read_exact(&mut kind).map_err(truncated(FORMAT))?;
    Ok((len, kind))
}

/// Walks chunks up to the first `IDAT`. A truncated tail ends the walk.
fn scan_ancillary(cur: &mut Cursor<&[u8]>, info: &mut ImageInfo) {
    while let Ok((len, kind)) = read_chunk_header(cur) {
        let start = cur.position();
        match &kind {
            b"IDAT" | b"IEND" => break,
            b"pHYs" if len == 9 => {
                if let (Ok(x), Ok(y), Ok(unit)) = (
                    cur.read_u32::<BigEndian>(),
                    cur.read_u32::<BigEndian>(),
                    cur.read_u8(),
                ) {
                    if unit == 1 {
                        info.density = Some(Density::from_pixels_per_meter(x, y));
                    }
                }
            }
            b"acTL" if len == 8 => {
                if let Ok(frames) = cur.read_u32::<BigEndian>() {
                    info.frame_count = frames.max(1) as usize;
                }
            }
            _ => {}
        }
        // Skip payload and CRC.
        cur.set_position(start + u64::from(len) + 4);
    }
}
