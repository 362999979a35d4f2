//! Format listing command.

use crate::FormatsArgs;
use anyhow::Result;
use imkit_core::{FormatDescriptor, ImageFormat};
use imkit_io::FormatRegistry;
use std::sync::Arc;

/// Lists registered formats matching the filters, ordered by identifier.
pub fn run(args: FormatsArgs, verbose: bool) -> Result<()> {
    let module = match &args.module {
        Some(name) => Some(name.parse::<ImageFormat>()?),
        None => None,
    };

    let formats: Vec<Arc<FormatDescriptor>> = FormatRegistry::global()
        .all()?
        .into_iter()
        .filter(|d| !args.readable || d.supports_reading())
        .filter(|d| !args.writable || d.supports_writing())
        .filter(|d| !args.multi_frame || d.supports_multiple_frames())
        .filter(|d| module.is_none_or(|m| d.module_format() == m))
        .collect();

    if args.json {
        print_json(&formats);
        return Ok(());
    }

    for d in &formats {
        let alias = if d.is_alias() {
            format!(" -> {}", d.module_format())
        } else {
            String::new()
        };
        println!(
            "{:<10} {}  {}{}",
            d.format().engine_name(),
            super::capability_flags(d),
            d.description().unwrap_or(""),
            alias
        );
        if verbose {
            if let Some(mime) = d.mime_type() {
                println!("{:<10} {:5}  {}", "", "", mime);
            }
        }
    }
    if verbose {
        println!("{} formats", formats.len());
    }
    Ok(())
}

fn print_json(formats: &[Arc<FormatDescriptor>]) {
    println!("[");
    for (idx, d) in formats.iter().enumerate() {
        let comma = if idx + 1 < formats.len() { "," } else { "" };
        println!(
            "  {{\"format\": \"{}\", \"module\": \"{}\", \"description\": {}, \"mime_type\": {}, \"read\": {}, \"write\": {}, \"multi_frame\": {}}}{}",
            d.format(),
            d.module_format(),
            super::json_opt(d.description()),
            super::json_opt(d.mime_type()),
            d.supports_reading(),
            d.supports_writing(),
            d.supports_multiple_frames(),
            comma
        );
    }
    println!("]");
}
