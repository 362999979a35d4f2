//! Image header info command.
//!
//! Probes every input in parallel and prints the results in input order.
//! A file that fails to probe is reported and counted; the others still
//! print.

use crate::InfoArgs;
use anyhow::{Result, bail};
use imkit_io::{ImageInfo, IoError, IoResult, ResourceLimits};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

struct Probed {
    path: PathBuf,
    size: u64,
    result: IoResult<Vec<ImageInfo>>,
}

/// Runs the info command.
pub fn run(args: InfoArgs, verbose: bool) -> Result<()> {
    let probed: Vec<Probed> = args
        .input
        .par_iter()
        .map(|path| probe(path, args.frames))
        .collect();

    let mut failed = 0usize;
    if args.json {
        print_json(&probed);
        failed = probed.iter().filter(|p| p.result.is_err()).count();
    } else {
        for (idx, p) in probed.iter().enumerate() {
            match &p.result {
                Ok(frames) => print_text(p, frames, verbose),
                Err(e) => {
                    eprintln!("{}: {e}", p.path.display());
                    failed += 1;
                }
            }
            if idx + 1 < probed.len() {
                println!();
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} files could not be read", probed.len());
    }
    Ok(())
}

fn probe(path: &Path, all_frames: bool) -> Probed {
    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let result = if all_frames {
        ResourceLimits::global()
            .check_memory_request(size)
            .and_then(|()| fs::read(path).map_err(IoError::from))
            .and_then(|data| ImageInfo::read_collection(&data))
    } else {
        ImageInfo::read(path).map(|info| vec![info])
    };
    Probed {
        path: path.to_path_buf(),
        size,
        result,
    }
}

/// Prints info in human-readable text format.
fn print_text(p: &Probed, frames: &[ImageInfo], verbose: bool) {
    let Some(first) = frames.first() else {
        return;
    };
    println!("{}", p.path.display());
    println!("  Format:      {}", first.format.engine_name());
    println!("  Resolution:  {}x{}", first.width, first.height);
    println!("  Depth:       {}-bit", first.depth);
    println!("  Color space: {}", first.color_space);
    println!("  Compression: {}", first.compression);
    println!("  File size:   {}", imkit_io::limits::format_bytes(p.size));
    if first.frame_count > 1 {
        println!("  Frames:      {}", first.frame_count);
    }

    if verbose {
        println!("  Interlace:   {}", first.interlace);
        println!("  Stored as:   {}-bit", first.effective_depth());
        if let Some(density) = first.density {
            println!("  Density:     {density}");
        }
        if let Some(quality) = first.quality {
            println!("  Quality:     {quality}");
        }
    }

    if frames.len() > 1 {
        println!("  Frame details:");
        for (idx, frame) in frames.iter().enumerate() {
            println!(
                "    [{}] {}x{} {}",
                idx, frame.width, frame.height, frame.interlace
            );
        }
    }
}

/// Prints info in JSON format.
fn print_json(probed: &[Probed]) {
    println!("[");
    for (idx, p) in probed.iter().enumerate() {
        let comma = if idx + 1 < probed.len() { "," } else { "" };
        let file = super::json_escape(&p.path.display().to_string());
        match &p.result {
            Ok(frames) => {
                let entries: Vec<String> = frames.iter().map(frame_json).collect();
                println!(
                    "  {{\"file\": \"{}\", \"size_bytes\": {}, \"frames\": [{}]}}{}",
                    file,
                    p.size,
                    entries.join(", "),
                    comma
                );
            }
            Err(e) => println!(
                "  {{\"file\": \"{}\", \"error\": \"{}\"}}{}",
                file,
                super::json_escape(&e.to_string()),
                comma
            ),
        }
    }
    println!("]");
}

fn frame_json(info: &ImageInfo) -> String {
    let density = info
        .density
        .map_or_else(|| "null".to_string(), |d| format!("\"{d}\""));
    let quality = info
        .quality
        .map_or_else(|| "null".to_string(), |q| q.to_string());
    format!(
        "{{\"format\": \"{}\", \"width\": {}, \"height\": {}, \"depth\": {}, \"color_space\": \"{}\", \"compression\": \"{}\", \"interlace\": \"{}\", \"density\": {}, \"quality\": {}, \"frame_count\": {}}}",
        info.format,
        info.width,
        info.height,
        info.depth,
        info.color_space,
        info.compression,
        info.interlace,
        density,
        quality,
        info.frame_count
    )
}
