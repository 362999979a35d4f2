//! WebP header probing.
//!
//! Walks the RIFF chunks. Simple files carry one `VP8 ` (lossy) or `VP8L`
//! (lossless) chunk. Extended files start with `VP8X`, which holds the
//! canvas size; animated ones hold one `ANMF` chunk per frame.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use imkit_core::{ColorSpace, Compression, ImageFormat};

use crate::info::{ImageInfo, truncated};
use crate::{IoError, IoResult};

const FORMAT: ImageFormat = ImageFormat::WebP;

const VP8_START_CODE: [u8; 3] = [0x9D, 0x01, 0x2A];
const VP8L_SIGNATURE: u8 = 0x2F;

/// Probes a WebP header.
pub fn probe(data: &[u8]) -> IoResult<ImageInfo> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WEBP" {
        return Err(IoError::corrupt(FORMAT, "bad RIFF header"));
    }

    let mut cur = Cursor::new(data);
    cur.set_position(12);

    let mut canvas: Option<(u32, u32)> = None;
    let mut compression = None;
    let mut frames = 0usize;

    while let Ok((kind, len)) = read_chunk_header(&mut cur) {
        let start = cur.position();
        match &kind {
            b"VP8X" => canvas = Some(read_vp8x(&mut cur)?),
            b"VP8 " => {
                let size = read_vp8(&mut cur)?;
                canvas.get_or_insert(size);
                compression.get_or_insert(Compression::WebP);
            }
            b"VP8L" => {
                let size = read_vp8l(&mut cur)?;
                canvas.get_or_insert(size);
                compression.get_or_insert(Compression::WebPLossless);
            }
            b"ANMF" => {
                frames += 1;
                // Frame header is 16 bytes, followed by the frame's own
                // bitstream chunk.
                cur.set_position(start + 16);
                if let Ok((inner, _)) = read_chunk_header(&mut cur) {
                    match &inner {
                        b"VP8 " => {
                            compression.get_or_insert(Compression::WebP);
                        }
                        b"VP8L" => {
                            compression.get_or_insert(Compression::WebPLossless);
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        // Chunks are padded to even length.
        cur.set_position(start + u64::from(len) + u64::from(len & 1));
        if canvas.is_some() && compression.is_some() && frames == 0 && &kind != b"VP8X" {
            break;
        }
    }

    let (width, height) = canvas.ok_or_else(|| IoError::corrupt(FORMAT, "no image chunk"))?;
    let mut info = ImageInfo::new(FORMAT, width, height, 8)
        .with_color_space(ColorSpace::Srgb)
        .with_compression(compression.unwrap_or(Compression::WebP));
    info.frame_count = frames.max(1);
    Ok(info)
}

fn read_chunk_header(cur: &mut Cursor<&[u8]>) -> IoResult<([u8; 4], u32)> {
    let mut kind = [0u8; 4];
    cur.read_exact(&mut kind).map_err(truncated(FORMAT))?;
    let len = cur.read_u32::<LittleEndian>().map_err(truncated(FORMAT))?;
    Ok((kind, len))
}

fn read_vp8x(cur: &mut Cursor<&[u8]>) -> IoResult<(u32, u32)> {
    let _flags = cur.read_u32::<LittleEndian>().map_err(truncated(FORMAT))?;
    let width = cur.read_u24::<LittleEndian>().map_err(truncated(FORMAT))? + 1;
    let height = cur.read_u24::<LittleEndian>().map_err(truncated(FORMAT))? + 1;
    Ok((width, height))
}

fn read_vp8(cur: &mut Cursor<&[u8]>) -> IoResult<(u32, u32)> {
    let _frame_tag = cur.read_u24::<LittleEndian>().map_err(truncated(FORMAT))?;
    let mut code = [0u8; 3];
    cur.read_exact(&mut code).map_err(truncated(FORMAT))?;
    if code != VP8_START_CODE {
        return Err(IoError::corrupt(FORMAT, "missing VP8 start code"));
    }
    let width = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))? & 0x3FFF;
    let height = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))? & 0x3FFF;
    if width == 0 || height == 0 {
        return Err(IoError::corrupt(FORMAT, "zero dimension"));
    }
    Ok((u32::from(width), u32::from(height)))
}

fn read_vp8l(cur: &mut Cursor<&[u8]>) -> IoResult<(u32, u32)> {
    if cur.read_u8().map_err(truncated(FORMAT))? != VP8L_SIGNATURE {
        return Err(IoError::corrupt(FORMAT, "missing VP8L signature"));
    }
    let bits = cur.read_u32::<LittleEndian>().map_err(truncated(FORMAT))?;
    let width = (bits & 0x3FFF) + 1;
    let height = ((bits >> 14) & 0x3FFF) + 1;
    Ok((width, height))
}
