//! JPEG header probing.
//!
//! Walks marker segments up to the first start-of-frame. Along the way it
//! picks up JFIF density (APP0) and the luminance quantization table
//! (DQT), from which the encoder quality is estimated.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use imkit_core::{ColorSpace, Compression, Density, DensityUnit, ImageFormat, Interlace};

use crate::info::{ImageInfo, truncated};
use crate::{IoError, IoResult};

const FORMAT: ImageFormat = ImageFormat::Jpeg;

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const DQT: u8 = 0xDB;
const APP0: u8 = 0xE0;

/// Annex K luminance table used by libjpeg-compatible encoders at quality 50.
const STD_LUMINANCE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, 12, 12, 14, 19, 26, 58, 60, 55, 14, 13, 16, 24, 40, 57, 69,
    56, 14, 17, 22, 29, 51, 87, 80, 62, 18, 22, 37, 56, 68, 109, 103, 77, 24, 35, 55, 64, 81, 104,
    113, 92, 49, 64, 78, 87, 103, 121, 120, 101, 72, 92, 95, 98, 112, 100, 103, 99,
];

/// Probes a JPEG header.
pub fn probe(data: &[u8]) -> IoResult<ImageInfo> {
    let mut cur = Cursor::new(data);
    if cur.read_u8().map_err(truncated(FORMAT))? != 0xFF
        || cur.read_u8().map_err(truncated(FORMAT))? != SOI
    {
        return Err(IoError::corrupt(FORMAT, "missing SOI marker"));
    }

    let mut density = None;
    let mut quality = None;

    loop {
        let marker = next_marker(&mut cur)?;
        match marker {
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => continue,
            EOI | SOS => return Err(IoError::corrupt(FORMAT, "no frame header before scan data")),
            _ => {}
        }

        let len = cur.read_u16::<BigEndian>().map_err(truncated(FORMAT))?;
        if len < 2 {
            return Err(IoError::corrupt(FORMAT, "segment length below 2"));
        }
        let start = cur.position();
        let payload_len = u64::from(len) - 2;

        if let Some((compression, interlace)) = frame_kind(marker) {
            let _precision = cur.read_u8().map_err(truncated(FORMAT))?;
            let height = cur.read_u16::<BigEndian>().map_err(truncated(FORMAT))?;
            let width = cur.read_u16::<BigEndian>().map_err(truncated(FORMAT))?;
            let components = cur.read_u8().map_err(truncated(FORMAT))?;
            if width == 0 || height == 0 {
                return Err(IoError::corrupt(FORMAT, "zero dimension in frame header"));
            }
            let color_space = match components {
                1 => ColorSpace::Gray,
                3 => ColorSpace::Srgb,
                4 => ColorSpace::Cmyk,
                n => return Err(IoError::corrupt(FORMAT, format!("{n} components"))),
            };

            let mut info = ImageInfo::new(FORMAT, u32::from(width), u32::from(height), 8)
                .with_color_space(color_space)
                .with_compression(compression);
            info.interlace = interlace;
            info.density = density;
            info.quality = quality;
            return Ok(info);
        }

        match marker {
            APP0 => density = read_jfif_density(&mut cur, payload_len).or(density),
            DQT => quality = read_quality(&mut cur, payload_len).or(quality),
            _ => {}
        }
        cur.set_position(start + payload_len);
    }
}

fn next_marker(cur: &mut Cursor<&[u8]>) -> IoResult<u8> {
    if cur.read_u8().map_err(truncated(FORMAT))? != 0xFF {
        return Err(IoError::corrupt(FORMAT, "expected marker"));
    }
    // Fill bytes: any number of 0xFF may precede the marker code.
    loop {
        let byte = cur.read_u8().map_err(truncated(FORMAT))?;
        if byte != 0xFF {
            return Ok(byte);
        }
    }
}

/// Compression and interlace for start-of-frame markers.
fn frame_kind(marker: u8) -> Option<(Compression, Interlace)> {
    match marker {
        0xC0 | 0xC1 | 0xC5 | 0xC9 | 0xCD => Some((Compression::Jpeg, Interlace::NoInterlace)),
        0xC2 | 0xC6 | 0xCA | 0xCE => Some((Compression::Jpeg, Interlace::Jpeg)),
        0xC3 | 0xC7 | 0xCB | 0xCF => Some((Compression::LosslessJpeg, Interlace::NoInterlace)),
        _ => None,
    }
}

fn read_jfif_density(cur: &mut Cursor<&[u8]>, len: u64) -> Option<Density> {
    if len < 12 {
        return None;
    }
    let mut ident = [0u8; 5];
    cur.read_exact(&mut ident).ok()?;
    if &ident != b"JFIF\0" {
        return None;
    }
    let _version = cur.read_u16::<BigEndian>().ok()?;
    let units = match cur.read_u8().ok()? {
        1 => DensityUnit::PixelsPerInch,
        2 => DensityUnit::PixelsPerCentimeter,
        _ => DensityUnit::Undefined,
    };
    let x = cur.read_u16::<BigEndian>().ok()?;
    let y = cur.read_u16::<BigEndian>().ok()?;
    Some(Density::new(f64::from(x), f64::from(y), units))
}

/// Estimates quality from table 0 by inverting the libjpeg scaling rule.
fn read_quality(cur: &mut Cursor<&[u8]>, len: u64) -> Option<u32> {
    let end = cur.position() + len;
    while cur.position() < end {
        let pq_tq = cur.read_u8().ok()?;
        let sixteen_bit = pq_tq >> 4 != 0;
        let mut sum = 0u32;
        for _ in 0..64 {
            let q = if sixteen_bit {
                cur.read_u16::<BigEndian>().ok()?
            } else {
                u16::from(cur.read_u8().ok()?)
            };
            sum += u32::from(q);
        }
        if pq_tq & 0x0F == 0 {
            return Some(quality_from_sum(sum));
        }
    }
    None
}

fn quality_from_sum(sum: u32) -> u32 {
    let std_sum: u32 = STD_LUMINANCE.iter().map(|&v| u32::from(v)).sum();
    let scale = f64::from(sum) * 100.0 / f64::from(std_sum);
    let quality = if scale <= 100.0 {
        (200.0 - scale) / 2.0
    } else {
        5000.0 / scale
    };
    quality.round().clamp(1.0, 100.0) as u32
}
