//! GIF header probing.
//!
//! Walks the block stream without decompressing anything: image
//! descriptors are recorded as frames, extensions and LZW sub-blocks are
//! skipped. A stream cut off after at least one frame is treated as ending
//! there.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use imkit_core::{ColorSpace, Compression, ImageFormat, Interlace};

use crate::info::{ImageInfo, truncated};
use crate::{IoError, IoResult};

const FORMAT: ImageFormat = ImageFormat::Gif;

const IMAGE_DESCRIPTOR: u8 = 0x2C;
const EXTENSION: u8 = 0x21;
const TRAILER: u8 = 0x3B;

struct Screen {
    width: u16,
    height: u16,
}

/// Probes a GIF: logical screen geometry plus the frame count.
pub fn probe(data: &[u8]) -> IoResult<ImageInfo> {
    let (screen, frames) = walk(data)?;
    let interlace = frames
        .first()
        .map_or(Interlace::NoInterlace, |f| f.interlace);

    let mut info = ImageInfo::new(FORMAT, u32::from(screen.width), u32::from(screen.height), 8)
        .with_color_space(ColorSpace::Srgb)
        .with_compression(Compression::Lzw);
    info.interlace = interlace;
    info.frame_count = frames.len();
    Ok(info)
}

/// Probes every frame; each carries its own geometry and interlace flag.
pub fn probe_frames(data: &[u8]) -> IoResult<Vec<ImageInfo>> {
    let (_, frames) = walk(data)?;
    let count = frames.len();
    Ok(frames
        .into_iter()
        .map(|mut f| {
            f.frame_count = count;
            f
        })
        .collect())
}

fn walk(data: &[u8]) -> IoResult<(Screen, Vec<ImageInfo>)> {
    let mut cur = Cursor::new(data);
    let mut magic = [0u8; 6];
    cur.read_exact(&mut magic).map_err(truncated(FORMAT))?;
    if &magic != b"GIF87a" && &magic != b"GIF89a" {
        return Err(IoError::corrupt(FORMAT, "bad signature"));
    }

    let width = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
    let height = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
    let packed = cur.read_u8().map_err(truncated(FORMAT))?;
    let _background = cur.read_u8().map_err(truncated(FORMAT))?;
    let _aspect = cur.read_u8().map_err(truncated(FORMAT))?;
    if width == 0 || height == 0 {
        return Err(IoError::corrupt(FORMAT, "zero logical screen dimension"));
    }
    if packed & 0x80 != 0 {
        skip(&mut cur, color_table_len(packed))?;
    }

    let mut frames = Vec::new();
    loop {
        let block = match cur.read_u8() {
            Ok(b) => b,
            Err(_) if !frames.is_empty() => break,
            Err(e) => return Err(truncated(FORMAT)(e)),
        };
        let step = match block {
            IMAGE_DESCRIPTOR => read_frame(&mut cur).map(|frame| frames.push(frame)),
            EXTENSION => cur
                .read_u8()
                .map_err(truncated(FORMAT))
                .and_then(|_label| skip_sub_blocks(&mut cur)),
            TRAILER => break,
            other => {
                return Err(IoError::corrupt(FORMAT, format!("unknown block 0x{other:02X}")));
            }
        };
        match step {
            Ok(()) => {}
            Err(IoError::CorruptHeader { .. }) if !frames.is_empty() => break,
            Err(e) => return Err(e),
        }
    }

    if frames.is_empty() {
        return Err(IoError::corrupt(FORMAT, "no image data"));
    }
    Ok((Screen { width, height }, frames))
}

fn read_frame(cur: &mut Cursor<&[u8]>) -> IoResult<ImageInfo> {
    let _left = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
    let _top = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
    let width = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
    let height = cur.read_u16::<LittleEndian>().map_err(truncated(FORMAT))?;
    let packed = cur.read_u8().map_err(truncated(FORMAT))?;
    if packed & 0x80 != 0 {
        skip(cur, color_table_len(packed))?;
    }
    let _lzw_min_code = cur.read_u8().map_err(truncated(FORMAT))?;
    skip_sub_blocks(cur)?;

    let mut frame = ImageInfo::new(FORMAT, u32::from(width), u32::from(height), 8)
        .with_color_space(ColorSpace::Srgb)
        .with_compression(Compression::Lzw);
    if packed & 0x40 != 0 {
        frame.interlace = Interlace::Gif;
    }
    Ok(frame)
}

fn color_table_len(packed: u8) -> u64 {
    3 * (1u64 << ((packed & 0x07) + 1))
}

fn skip(cur: &mut Cursor<&[u8]>, len: u64) -> IoResult<()> {
    let end = cur.position() + len;
    if end > cur.get_ref().len() as u64 {
        return Err(IoError::corrupt(FORMAT, "truncated header"));
    }
    cur.set_position(end);
    Ok(())
}

fn skip_sub_blocks(cur: &mut Cursor<&[u8]>) -> IoResult<()> {
    loop {
        let len = cur.read_u8().map_err(truncated(FORMAT))?;
        if len == 0 {
            return Ok(());
        }
        skip(cur, u64::from(len))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(width: u16, height: u16, global_table: bool) -> Vec<u8> {
        let mut out = b"GIF89a".to_vec();
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        // 2-entry global color table when set
        out.extend_from_slice(&[if global_table { 0x80 } else { 0 }, 0, 0]);
        if global_table {
            out.extend_from_slice(&[0; 6]);
        }
        out
    }

    fn frame(width: u16, height: u16, interlaced: bool) -> Vec<u8> {
        let mut out = vec![IMAGE_DESCRIPTOR, 0, 0, 0, 0];
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.push(if interlaced { 0x40 } else { 0 });
        // LZW minimum code size, one data sub-block, terminator
        out.extend_from_slice(&[2, 2, 0x44, 0x01, 0]);
        out
    }

    fn graphic_control() -> Vec<u8> {
        vec![EXTENSION, 0xF9, 4, 0, 10, 0, 0, 0]
    }

    #[test]
    fn test_single_frame() {
        let mut data = header(4, 3, true);
        data.extend(frame(4, 3, false));
        data.push(TRAILER);

        let info = probe(&data).unwrap();
        assert_eq!((info.width, info.height), (4, 3));
        assert_eq!(info.frame_count, 1);
        assert_eq!(info.compression, Compression::Lzw);
        assert_eq!(info.interlace, Interlace::NoInterlace);
    }

    #[test]
    fn test_animation_frames() {
        let mut data = header(10, 10, false);
        for (w, h) in [(10, 10), (4, 4), (2, 8)] {
            data.extend(graphic_control());
            data.extend(frame(w, h, w == 4));
        }
        data.push(TRAILER);

        assert_eq!(probe(&data).unwrap().frame_count, 3);
        let frames = probe_frames(&data).unwrap();
        let sizes: Vec<_> = frames.iter().map(|f| (f.width, f.height)).collect();
        assert_eq!(sizes, vec![(10, 10), (4, 4), (2, 8)]);
        assert_eq!(frames[1].interlace, Interlace::Gif);
        assert!(frames.iter().all(|f| f.frame_count == 3));
    }

    #[test]
    fn test_truncated_after_first_frame() {
        let mut data = header(4, 4, false);
        data.extend(frame(4, 4, false));
        data.extend(&frame(4, 4, false)[..7]);
        assert_eq!(probe(&data).unwrap().frame_count, 1);
    }

    #[test]
    fn test_corrupt() {
        assert!(matches!(probe(b"GIF89a\x01"), Err(IoError::CorruptHeader { .. })));
        let mut no_frames = header(4, 4, false);
        no_frames.push(TRAILER);
        assert!(matches!(probe(&no_frames), Err(IoError::CorruptHeader { .. })));
        let mut bad_block = header(4, 4, false);
        bad_block.push(0x99);
        assert!(matches!(probe(&bad_block), Err(IoError::CorruptHeader { .. })));
    }
}
