//! TIFF header probing.
//!
//! Classic TIFF only (32-bit offsets). Each image file directory (IFD)
//! becomes one frame. The IFD chain is followed until a zero offset, an
//! offset outside the available data, or an offset already visited.

use std::collections::HashSet;
use std::io::Cursor;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use imkit_core::{ColorSpace, Compression, Density, DensityUnit, ImageFormat};

use crate::info::{ImageInfo, truncated};
use crate::{IoError, IoResult};

const FORMAT: ImageFormat = ImageFormat::Tiff;

const TAG_WIDTH: u16 = 256;
const TAG_HEIGHT: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_X_RESOLUTION: u16 = 282;
const TAG_Y_RESOLUTION: u16 = 283;
const TAG_RESOLUTION_UNIT: u16 = 296;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

/// Probes the first directory and counts the rest.
pub fn probe(data: &[u8]) -> IoResult<ImageInfo> {
    let frames = probe_frames(data)?;
    let count = frames.len();
    frames
        .into_iter()
        .next()
        .map(|mut first| {
            first.frame_count = count;
            first
        })
        .ok_or_else(|| IoError::corrupt(FORMAT, "no image directory"))
}

/// Probes every directory in the chain.
pub fn probe_frames(data: &[u8]) -> IoResult<Vec<ImageInfo>> {
    match data.get(0..4) {
        Some([0x49, 0x49, 0x2A, 0x00]) => walk::<LittleEndian>(data),
        Some([0x4D, 0x4D, 0x00, 0x2A]) => walk::<BigEndian>(data),
        Some(_) => Err(IoError::corrupt(FORMAT, "bad byte order mark")),
        None => Err(IoError::corrupt(FORMAT, "truncated header")),
    }
}

fn walk<B: ByteOrder>(data: &[u8]) -> IoResult<Vec<ImageInfo>> {
    let mut cur = Cursor::new(data);
    cur.set_position(4);
    let mut offset = cur.read_u32::<B>().map_err(truncated(FORMAT))?;

    let mut frames = Vec::new();
    let mut visited = HashSet::new();
    while offset != 0 && visited.insert(offset) {
        if frames.is_empty() || (offset as usize) < data.len() {
            cur.set_position(u64::from(offset));
        } else {
            break;
        }
        match read_ifd::<B>(&mut cur) {
            Ok((frame, next)) => {
                frames.push(frame);
                offset = next;
            }
            Err(IoError::CorruptHeader { .. }) if !frames.is_empty() => break,
            Err(e) => return Err(e),
        }
    }

    if frames.is_empty() {
        return Err(IoError::corrupt(FORMAT, "no image directory"));
    }
    Ok(frames)
}

struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    value: [u8; 4],
}

impl Entry {
    /// First value of a SHORT or LONG entry, stored inline.
    fn scalar<B: ByteOrder>(&self) -> Option<u32> {
        match self.kind {
            TYPE_SHORT => Some(u32::from(B::read_u16(&self.value))),
            TYPE_LONG => Some(B::read_u32(&self.value)),
            _ => None,
        }
    }
}

fn read_ifd<B: ByteOrder>(cur: &mut Cursor<&[u8]>) -> IoResult<(ImageInfo, u32)> {
    let count = cur.read_u16::<B>().map_err(truncated(FORMAT))?;
    let mut entries = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let tag = cur.read_u16::<B>().map_err(truncated(FORMAT))?;
        let kind = cur.read_u16::<B>().map_err(truncated(FORMAT))?;
        let n = cur.read_u32::<B>().map_err(truncated(FORMAT))?;
        let mut value = [0u8; 4];
        std::io::Read::read_exact(cur, &mut value).map_err(truncated(FORMAT))?;
        entries.push(Entry {
            tag,
            kind,
            count: n,
            value,
        });
    }
    // A missing next-IFD offset ends the chain.
    let next = cur.read_u32::<B>().unwrap_or(0);

    let find = |tag: u16| entries.iter().find(|e| e.tag == tag);
    let scalar = |tag: u16| find(tag).and_then(Entry::scalar::<B>);

    let width = scalar(TAG_WIDTH).ok_or_else(|| IoError::corrupt(FORMAT, "missing ImageWidth"))?;
    let height = scalar(TAG_HEIGHT).ok_or_else(|| IoError::corrupt(FORMAT, "missing ImageLength"))?;
    if width == 0 || height == 0 {
        return Err(IoError::corrupt(FORMAT, "zero dimension"));
    }

    let depth = match find(TAG_BITS_PER_SAMPLE) {
        Some(e) if e.kind == TYPE_SHORT && e.count > 2 => {
            read_at::<B>(cur.get_ref(), B::read_u32(&e.value)).map(u32::from)
        }
        Some(e) => e.scalar::<B>(),
        None => Some(1),
    }
    .ok_or_else(|| IoError::corrupt(FORMAT, "unreadable BitsPerSample"))?;

    let compression = match scalar(TAG_COMPRESSION).unwrap_or(1) {
        1 => Compression::NoCompression,
        2 | 32773 => Compression::Rle,
        3 => Compression::Group3,
        4 => Compression::Group4,
        5 => Compression::Lzw,
        6 | 7 => Compression::Jpeg,
        8 | 32946 => Compression::Zip,
        _ => Compression::Undefined,
    };

    let color_space = match scalar(TAG_PHOTOMETRIC) {
        Some(0 | 1) => ColorSpace::Gray,
        Some(2 | 3) => ColorSpace::Srgb,
        Some(5) => ColorSpace::Cmyk,
        Some(6) => ColorSpace::YCbCr,
        Some(8) => ColorSpace::Lab,
        _ => ColorSpace::Undefined,
    };

    let mut info = ImageInfo::new(FORMAT, width, height, depth)
        .with_color_space(color_space)
        .with_compression(compression);
    info.density = read_density::<B>(cur.get_ref(), &find);
    Ok((info, next))
}

fn read_at<B: ByteOrder>(data: &[u8], offset: u32) -> Option<u16> {
    let start = offset as usize;
    data.get(start..start + 2).map(B::read_u16)
}

fn read_rational<B: ByteOrder>(data: &[u8], entry: &Entry) -> Option<f64> {
    if entry.kind != TYPE_RATIONAL {
        return None;
    }
    let start = B::read_u32(&entry.value) as usize;
    let bytes = data.get(start..start + 8)?;
    let num = B::read_u32(&bytes[0..4]);
    let den = B::read_u32(&bytes[4..8]);
    (den != 0).then(|| f64::from(num) / f64::from(den))
}

fn read_density<'a, B: ByteOrder>(
    data: &[u8],
    find: &impl Fn(u16) -> Option<&'a Entry>,
) -> Option<Density> {
    let x = read_rational::<B>(data, find(TAG_X_RESOLUTION)?)?;
    let y = read_rational::<B>(data, find(TAG_Y_RESOLUTION)?)?;
    let units = match find(TAG_RESOLUTION_UNIT).and_then(Entry::scalar::<B>) {
        Some(3) => DensityUnit::PixelsPerCentimeter,
        Some(1) => DensityUnit::Undefined,
        // Inch is the TIFF default.
        _ => DensityUnit::PixelsPerInch,
    };
    Some(Density::new(x, y, units))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a little-endian TIFF with one IFD per `(width, height)`.
    fn tiff_le(frames: &[(u32, u32)]) -> Vec<u8> {
        let mut out = b"II\x2A\x00".to_vec();
        out.extend_from_slice(&8u32.to_le_bytes());
        for (i, &(w, h)) in frames.iter().enumerate() {
            let entries: [(u16, u16, u32); 5] = [
                (TAG_WIDTH, TYPE_LONG, w),
                (TAG_HEIGHT, TYPE_SHORT, h),
                (TAG_BITS_PER_SAMPLE, TYPE_SHORT, 16),
                (TAG_COMPRESSION, TYPE_SHORT, 5),
                (TAG_PHOTOMETRIC, TYPE_SHORT, 1),
            ];
            out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
            for (tag, kind, value) in entries {
                out.extend_from_slice(&tag.to_le_bytes());
                out.extend_from_slice(&kind.to_le_bytes());
                out.extend_from_slice(&1u32.to_le_bytes());
                out.extend_from_slice(&value.to_le_bytes());
            }
            let next = if i + 1 == frames.len() {
                0
            } else {
                out.len() as u32 + 4
            };
            out.extend_from_slice(&next.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_little_endian_single() {
        let info = probe(&tiff_le(&[(640, 480)])).unwrap();
        assert_eq!((info.width, info.height, info.depth), (640, 480, 16));
        assert_eq!(info.compression, Compression::Lzw);
        assert_eq!(info.color_space, ColorSpace::Gray);
        assert_eq!(info.frame_count, 1);
        assert!(info.density.is_none());
    }

    #[test]
    fn test_multi_page() {
        let data = tiff_le(&[(10, 10), (5, 5), (2, 3)]);
        assert_eq!(probe(&data).unwrap().frame_count, 3);
        let sizes: Vec<_> = probe_frames(&data)
            .unwrap()
            .iter()
            .map(|f| (f.width, f.height))
            .collect();
        assert_eq!(sizes, vec![(10, 10), (5, 5), (2, 3)]);
    }

    #[test]
    fn test_cyclic_chain_terminates() {
        let mut data = tiff_le(&[(4, 4)]);
        let len = data.len();
        data[len - 4..].copy_from_slice(&8u32.to_le_bytes());
        assert_eq!(probe(&data).unwrap().frame_count, 1);
    }

    #[test]
    fn test_big_endian_with_density() {
        let mut out = b"MM\x00\x2A".to_vec();
        out.extend_from_slice(&8u32.to_be_bytes());
        // 5 entries, then next-IFD, then two rationals at offset 8+2+60+4 = 74
        let rational_at = 74u32;
        let entries: [(u16, u16, u32); 5] = [
            (TAG_WIDTH, TYPE_LONG, 7),
            (TAG_HEIGHT, TYPE_LONG, 9),
            (TAG_X_RESOLUTION, TYPE_RATIONAL, rational_at),
            (TAG_Y_RESOLUTION, TYPE_RATIONAL, rational_at + 8),
            (TAG_PHOTOMETRIC, TYPE_SHORT, 2),
        ];
        out.extend_from_slice(&5u16.to_be_bytes());
        for (tag, kind, value) in entries {
            out.extend_from_slice(&tag.to_be_bytes());
            out.extend_from_slice(&kind.to_be_bytes());
            out.extend_from_slice(&1u32.to_be_bytes());
            if kind == TYPE_SHORT {
                out.extend_from_slice(&(value as u16).to_be_bytes());
                out.extend_from_slice(&[0, 0]);
            } else {
                out.extend_from_slice(&value.to_be_bytes());
            }
        }
        out.extend_from_slice(&0u32.to_be_bytes());
        assert_eq!(out.len(), rational_at as usize);
        for v in [300u32, 1, 150, 1] {
            out.extend_from_slice(&v.to_be_bytes());
        }

        let info = probe(&out).unwrap();
        assert_eq!((info.width, info.height, info.depth), (7, 9, 1));
        assert_eq!(info.color_space, ColorSpace::Srgb);
        assert_eq!(info.compression, Compression::NoCompression);
        assert_eq!(info.density, Some(Density::new(300.0, 150.0, DensityUnit::PixelsPerInch)));
    }

    #[test]
    fn test_corrupt() {
        assert!(matches!(probe(b"II\x2A\x00"), Err(IoError::CorruptHeader { .. })));
        assert!(matches!(probe(b"II\x2A\x00\x00\x00\x00\x00"), Err(IoError::CorruptHeader { .. })));
        let mut zero = tiff_le(&[(0, 4)]);
        assert!(matches!(probe(&zero), Err(IoError::CorruptHeader { .. })));
        zero.truncate(12);
        assert!(matches!(probe(&zero), Err(IoError::CorruptHeader { .. })));
    }
}
