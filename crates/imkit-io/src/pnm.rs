//! Netpbm header probing: PBM, PGM, PPM (plain and raw), PAM and PFM.

use imkit_core::{ColorSpace, Compression, ImageFormat};

use crate::info::ImageInfo;
use crate::{IoError, IoResult};

/// Probes a Netpbm header.
pub fn probe(data: &[u8]) -> IoResult<ImageInfo> {
    let magic = data.get(0..2).ok_or_else(|| corrupt(ImageFormat::Pnm, "truncated header"))?;
    match magic {
        b"P1" | b"P4" => classic(data, ImageFormat::Pbm, ColorSpace::Gray, false),
        b"P2" | b"P5" => classic(data, ImageFormat::Pgm, ColorSpace::Gray, true),
        b"P3" | b"P6" => classic(data, ImageFormat::Ppm, ColorSpace::Srgb, true),
        b"P7" => pam(data),
        b"Pf" => float_map(data, ColorSpace::Gray),
        b"PF" => float_map(data, ColorSpace::Srgb),
        _ => Err(corrupt(ImageFormat::Pnm, "bad magic")),
    }
}

fn corrupt(format: ImageFormat, reason: impl Into<String>) -> IoError {
    IoError::corrupt(format, reason)
}

/// Whitespace-separated header tokens with `#` comments removed.
struct Tokens<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 2 }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        loop {
            match self.data.get(self.pos)? {
                b'#' => {
                    while !matches!(self.data.get(self.pos)?, b'\n' | b'\r') {
                        self.pos += 1;
                    }
                }
                b if b.is_ascii_whitespace() => self.pos += 1,
                _ => break,
            }
        }
        let start = self.pos;
        while self
            .data
            .get(self.pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'#')
        {
            self.pos += 1;
        }
        std::str::from_utf8(&self.data[start..self.pos]).ok()
    }

    fn number(&mut self, format: ImageFormat, what: &str) -> IoResult<u32> {
        let token = self
            .next_token()
            .ok_or_else(|| corrupt(format, format!("truncated header, missing {what}")))?;
        token
            .parse()
            .map_err(|_| corrupt(format, format!("invalid {what} '{token}'")))
    }
}

fn bits_for_maxval(format: ImageFormat, maxval: u32) -> IoResult<u32> {
    if maxval == 0 || maxval > 65535 {
        return Err(corrupt(format, format!("maxval {maxval} out of range")));
    }
    Ok(u32::BITS - maxval.leading_zeros())
}

fn geometry(format: ImageFormat, width: u32, height: u32, depth: u32) -> IoResult<ImageInfo> {
    if width == 0 || height == 0 {
        return Err(corrupt(format, "zero dimension"));
    }
    Ok(ImageInfo::new(format, width, height, depth).with_compression(Compression::NoCompression))
}

fn classic(data: &[u8], format: ImageFormat, color: ColorSpace, has_maxval: bool) -> IoResult<ImageInfo> {
    let mut tokens = Tokens::new(data);
    let width = tokens.number(format, "width")?;
    let height = tokens.number(format, "height")?;
    let depth = if has_maxval {
        bits_for_maxval(format, tokens.number(format, "maxval")?)?
    } else {
        1
    };
    Ok(geometry(format, width, height, depth)?.with_color_space(color))
}

fn pam(data: &[u8]) -> IoResult<ImageInfo> {
    const FORMAT: ImageFormat = ImageFormat::Pam;
    let mut tokens = Tokens::new(data);
    let (mut width, mut height, mut channels, mut maxval) = (None, None, None, None);
    let mut tuple_type = String::new();

    loop {
        let key = tokens
            .next_token()
            .ok_or_else(|| corrupt(FORMAT, "truncated header, missing ENDHDR"))?;
        match key {
            "WIDTH" => width = Some(tokens.number(FORMAT, "WIDTH")?),
            "HEIGHT" => height = Some(tokens.number(FORMAT, "HEIGHT")?),
            "DEPTH" => channels = Some(tokens.number(FORMAT, "DEPTH")?),
            "MAXVAL" => maxval = Some(tokens.number(FORMAT, "MAXVAL")?),
            "TUPLTYPE" => {
                if let Some(value) = tokens.next_token() {
                    tuple_type = value.to_string();
                }
            }
            "ENDHDR" => break,
            other => return Err(corrupt(FORMAT, format!("unknown header key '{other}'"))),
        }
    }

    let (Some(width), Some(height), Some(channels), Some(maxval)) = (width, height, channels, maxval)
    else {
        return Err(corrupt(FORMAT, "missing WIDTH, HEIGHT, DEPTH or MAXVAL"));
    };

    let color = match tuple_type.as_str() {
        "BLACKANDWHITE" | "GRAYSCALE" | "BLACKANDWHITE_ALPHA" | "GRAYSCALE_ALPHA" => ColorSpace::Gray,
        "RGB" | "RGB_ALPHA" => ColorSpace::Srgb,
        "CMYK" | "CMYK_ALPHA" => ColorSpace::Cmyk,
        _ => match channels {
            1 | 2 => ColorSpace::Gray,
            3 | 4 => ColorSpace::Srgb,
            _ => ColorSpace::Undefined,
        },
    };
    let depth = bits_for_maxval(FORMAT, maxval)?;
    Ok(geometry(FORMAT, width, height, depth)?.with_color_space(color))
}

fn float_map(data: &[u8], color: ColorSpace) -> IoResult<ImageInfo> {
    const FORMAT: ImageFormat = ImageFormat::Pfm;
    let mut tokens = Tokens::new(data);
    let width = tokens.number(FORMAT, "width")?;
    let height = tokens.number(FORMAT, "height")?;
    let scale = tokens
        .next_token()
        .ok_or_else(|| corrupt(FORMAT, "truncated header, missing scale"))?;
    let scale: f64 = scale
        .parse()
        .map_err(|_| corrupt(FORMAT, format!("invalid scale '{scale}'")))?;
    if scale == 0.0 || !scale.is_finite() {
        return Err(corrupt(FORMAT, "scale must be finite and non-zero"));
    }
    Ok(geometry(FORMAT, width, height, 32)?.with_color_space(color))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_ppm() {
        let info = probe(b"P6\n# made by hand\n640 480\n255\n\xff\xff").unwrap();
        assert_eq!(info.format, ImageFormat::Ppm);
        assert_eq!((info.width, info.height, info.depth), (640, 480, 8));
        assert_eq!(info.color_space, ColorSpace::Srgb);
    }

    #[test]
    fn test_pgm_16bit_and_odd_maxval() {
        assert_eq!(probe(b"P5 2 2 65535 ").unwrap().depth, 16);
        assert_eq!(probe(b"P2 2 2 1023\n").unwrap().depth, 10);
    }

    #[test]
    fn test_pbm() {
        let info = probe(b"P4\n8 2\n\x00\x00").unwrap();
        assert_eq!(info.format, ImageFormat::Pbm);
        assert_eq!(info.depth, 1);
        assert_eq!(info.color_space, ColorSpace::Gray);
    }

    #[test]
    fn test_pam() {
        let header = b"P7\nWIDTH 4\nHEIGHT 3\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n";
        let info = probe(header).unwrap();
        assert_eq!(info.format, ImageFormat::Pam);
        assert_eq!((info.width, info.height, info.depth), (4, 3, 8));
        assert_eq!(info.color_space, ColorSpace::Srgb);
    }

    #[test]
    fn test_pfm() {
        let info = probe(b"Pf\n3 2\n-1.0\n").unwrap();
        assert_eq!(info.format, ImageFormat::Pfm);
        assert_eq!(info.depth, 32);
        assert_eq!(info.color_space, ColorSpace::Gray);
    }

    #[test]
    fn test_corrupt() {
        for bad in [
            &b"P6\n640\n"[..],
            b"P6 0 4 255 ",
            b"P6 4 4 0 ",
            b"P6 4 4 70000 ",
            b"P6 x 4 255 ",
            b"P7\nWIDTH 4\nENDHDR\n",
            b"P7\nBOGUS 1\n",
            b"PF 1 1 0.0 ",
        ] {
            assert!(
                matches!(probe(bad), Err(IoError::CorruptHeader { .. })),
                "{}",
                String::from_utf8_lossy(bad)
            );
        }
    }
}
