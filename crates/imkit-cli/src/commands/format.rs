//! Single-format lookup command.

use crate::FormatArgs;
use anyhow::{Context, Result, bail};
use imkit_core::{FormatDescriptor, ImageFormat};
use imkit_io::FormatRegistry;
use imkit_io::detect::SNIFF_LEN;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Resolves the target by name, by extension, or by header bytes, then
/// prints its descriptor.
pub fn run(args: FormatArgs, verbose: bool) -> Result<()> {
    let registry = FormatRegistry::global();
    let target = args.target.as_str();
    let path = Path::new(target);

    let descriptor = if args.header {
        let mut header = Vec::with_capacity(SNIFF_LEN);
        File::open(path)
            .with_context(|| format!("Failed to open: {}", path.display()))?
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut header)?;
        if header.is_empty() {
            bail!("{} is empty", path.display());
        }
        registry.get_by_header(&header)?
    } else if path.extension().is_some() || path.exists() {
        registry.get_by_extension(path)?
    } else {
        registry.get(target.parse::<ImageFormat>()?)?
    };

    let Some(descriptor) = descriptor else {
        bail!("No registered format for '{target}'");
    };
    print_descriptor(&descriptor, verbose);
    Ok(())
}

fn print_descriptor(d: &Arc<FormatDescriptor>, verbose: bool) {
    println!("{}", d.format().engine_name());
    println!("  Module:      {}", d.module_format().engine_name());
    if let Some(description) = d.description() {
        println!("  Description: {description}");
    }
    if let Some(mime) = d.mime_type() {
        println!("  MIME type:   {mime}");
    }
    println!("  Read:        {}", yes_no(d.supports_reading()));
    println!("  Write:       {}", yes_no(d.supports_writing()));
    println!("  Multi-frame: {}", yes_no(d.supports_multiple_frames()));
    if verbose {
        println!("  MT read:     {}", yes_no(d.can_read_multithreaded()));
        println!("  MT write:    {}", yes_no(d.can_write_multithreaded()));
        println!("  Identifier:  {:?}", d.format());
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
