//! Magic-byte sniffing.
//!
//! Classifies a header by its signature and returns the engine name of the
//! format (`"PNG"`, `"TIFF64"`, ...). The built-in engine turns that name
//! back into a full record; callers normally go through
//! [`crate::FormatRegistry::get_by_header`] instead of calling this directly.
//!
//! Checks run from the most specific signature to the least specific, so
//! that e.g. a MNG stream is never mistaken for something shorter.

/// Longest prefix any signature check looks at.
pub const SNIFF_LEN: usize = 132;

/// Returns the engine name of the format whose signature `bytes` starts with.
pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
    if bytes.is_empty() {
        return None;
    }

    // PNG family: 8-byte signatures differing in the first byte
    if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Some("PNG");
    }
    if bytes.len() >= 8 && bytes[0..8] == [0x8A, 0x4D, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Some("MNG");
    }
    if bytes.len() >= 8 && bytes[0..8] == [0x8B, 0x4A, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Some("JNG");
    }

    // JPEG: SOI followed by a marker
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        return Some("JPEG");
    }

    // GIF: 87a and 89a both classify as GIF
    if bytes.len() >= 6 && (&bytes[0..6] == b"GIF87a" || &bytes[0..6] == b"GIF89a") {
        return Some("GIF");
    }

    // TIFF: classic little/big endian, then BigTIFF
    if bytes.len() >= 4 {
        match &bytes[0..4] {
            [0x49, 0x49, 0x2A, 0x00] | [0x4D, 0x4D, 0x00, 0x2A] => return Some("TIFF"),
            [0x49, 0x49, 0x2B, 0x00] | [0x4D, 0x4D, 0x00, 0x2B] => return Some("TIFF64"),
            _ => {}
        }
    }

    // WebP: RIFF....WEBP
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("WEBP");
    }

    // ISO base media: ftyp box with an image brand
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        match &bytes[8..12] {
            b"avif" | b"avis" => return Some("AVIF"),
            b"heic" | b"heix" | b"hevc" | b"hevx" => return Some("HEIC"),
            b"mif1" | b"msf1" => return Some("HEIF"),
            b"3gp4" | b"3gp5" | b"3gp6" => return Some("3GP"),
            b"3g2a" => return Some("3G2"),
            b"crx " => return Some("CR3"),
            _ => {}
        }
    }

    // JPEG-2000: JP2 container, then raw codestream
    if bytes.len() >= 12
        && bytes[0..12] == [0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A, 0x87, 0x0A]
    {
        return Some("JP2");
    }
    if bytes.len() >= 4 && bytes[0..4] == [0xFF, 0x4F, 0xFF, 0x51] {
        return Some("J2K");
    }

    // JPEG XL: bare codestream or ISO BMFF container
    if bytes.len() >= 2 && bytes[0..2] == [0xFF, 0x0A] {
        return Some("JXL");
    }
    if bytes.len() >= 12
        && bytes[0..12] == [0x00, 0x00, 0x00, 0x0C, 0x4A, 0x58, 0x4C, 0x20, 0x0D, 0x0A, 0x87, 0x0A]
    {
        return Some("JXL");
    }

    if bytes.len() >= 4 {
        match &bytes[0..4] {
            [0x76, 0x2F, 0x31, 0x01] => return Some("EXR"),
            b"SDPX" | b"XPDS" => return Some("DPX"),
            [0x80, 0x2A, 0x5F, 0xD7] => return Some("CIN"),
            b"qoif" => return Some("QOI"),
            b"DDS " => return Some("DDS"),
            b"%PDF" => return Some("PDF"),
            [0x00, 0x00, 0x01, 0x00] => return Some("ICO"),
            [0x00, 0x00, 0x02, 0x00] => return Some("CUR"),
            _ => {}
        }
    }

    // Photoshop: version 1 is PSD, version 2 is PSB
    if bytes.len() >= 6 && &bytes[0..4] == b"8BPS" {
        return match &bytes[4..6] {
            [0x00, 0x01] => Some("PSD"),
            [0x00, 0x02] => Some("PSB"),
            _ => None,
        };
    }

    if bytes.len() >= 8 && &bytes[0..8] == b"farbfeld" {
        return Some("FARBFELD");
    }
    if bytes.len() >= 9 && &bytes[0..9] == b"gimp xcf " {
        return Some("XCF");
    }
    if bytes.len() >= 9 && &bytes[0..9] == b"SIMPLE  =" {
        return Some("FITS");
    }
    if bytes.len() >= 4 && &bytes[0..4] == b"%!PS" {
        return Some("PS");
    }
    if bytes.len() >= 2 && &bytes[0..2] == b"#?" {
        return Some("HDR");
    }
    if bytes.len() >= SNIFF_LEN && &bytes[128..132] == b"DICM" {
        return Some("DCM");
    }
    if bytes.len() >= 2 && bytes[0..2] == [0x01, 0xDA] {
        return Some("SGI");
    }

    // BMP: "BM" plus a plausible DIB header size
    if bytes.len() >= 18 && &bytes[0..2] == b"BM" {
        let dib_size = u32::from_le_bytes([bytes[14], bytes[15], bytes[16], bytes[17]]);
        if matches!(dib_size, 12 | 40 | 52 | 56 | 64 | 108 | 124) {
            return Some("BMP");
        }
    }

    // Netpbm: P1..P7, Pf/PF
    if bytes.len() >= 3 && bytes[0] == b'P' && is_pnm_separator(bytes[2]) {
        match bytes[1] {
            b'1' | b'4' => return Some("PBM"),
            b'2' | b'5' => return Some("PGM"),
            b'3' | b'6' => return Some("PPM"),
            b'7' => return Some("PAM"),
            b'f' | b'F' => return Some("PFM"),
            _ => {}
        }
    }

    // SVG: text sniffing over the first bytes only
    let prefix = &bytes[..bytes.len().min(256)];
    // The cut may land inside a multi-byte character; keep the valid part.
    let text = match std::str::from_utf8(prefix) {
        Ok(text) => text,
        Err(err) => std::str::from_utf8(&prefix[..err.valid_up_to()]).unwrap_or_default(),
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg")) {
        return Some("SVG");
    }

    None
}

fn is_pnm_separator(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}
