//! CLI command implementations

pub mod format;
pub mod formats;
pub mod info;
pub mod limits;
pub mod version;

use imkit_core::FormatDescriptor;

/// One-letter capability flags: r(ead) w(rite) m(ulti-frame) plus
/// R/W for multithreaded read/write.
pub fn capability_flags(d: &FormatDescriptor) -> String {
    let flag = |set: bool, c: char| if set { c } else { '-' };
    [
        flag(d.supports_reading(), 'r'),
        flag(d.supports_writing(), 'w'),
        flag(d.supports_multiple_frames(), 'm'),
        flag(d.can_read_multithreaded(), 'R'),
        flag(d.can_write_multithreaded(), 'W'),
    ]
    .iter()
    .collect()
}

/// Escapes a string for a JSON string literal.
pub fn json_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(ch),
        }
    }
    out
}

/// JSON value for an optional string.
pub fn json_opt(value: Option<&str>) -> String {
    value.map_or_else(|| "null".to_string(), |v| format!("\"{}\"", json_escape(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use imkit_core::ImageFormat;

    #[test]
    fn test_capability_flags() {
        let d = FormatDescriptor::new(ImageFormat::Gif, ImageFormat::Gif)
            .with_reading(true)
            .with_multiple_frames(true)
            .with_multithreaded(true, false);
        assert_eq!(capability_flags(&d), "r-mR-");
    }

    #[test]
    fn test_json_escape() {
        assert_eq!(json_escape(r#"a "b" \c"#), r#"a \"b\" \\c"#);
        assert_eq!(json_escape("tab\there"), "tab\\there");
        assert_eq!(json_opt(None), "null");
        assert_eq!(json_opt(Some("x")), "\"x\"");
    }
}
