//! imkit - format registry and header inspection CLI
//!
//! Lists the formats the engine supports, inspects image headers and shows
//! the resource limits in effect.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use imkit_core::Percentage;
use imkit_io::log::{self, LogEvents};
use imkit_io::{ResourceLimits, environment};

mod commands;

#[derive(Parser)]
#[command(name = "imkit")]
#[command(author, version, about = "Image format registry and header inspection")]
#[command(long_about = "
Queries the image format registry and reads image headers without decoding
pixels. Every header is checked against the resource limits in effect.

Examples:
  imkit formats                         # All registered formats
  imkit formats --writable --module PNG # Writable PNG-family formats
  imkit format scan.tif                 # Descriptor for a file's extension
  imkit info shot_*.exr plate.png       # Header summary
  imkit info anim.gif --frames --json   # Per-frame geometry as JSON
  imkit --limit width=8000 info big.tif # Reject wide images
  imkit --config /etc/imkit limits      # Limits after applying a policy
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configure directory holding policy.yaml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Limit memory to a share of system memory (also sets area)
    #[arg(long, global = true, value_name = "PERCENT")]
    memory_percent: Option<f64>,

    /// Set a resource limit, e.g. --limit width=16000 (repeatable)
    #[arg(long = "limit", global = true, value_name = "NAME=VALUE")]
    limits: Vec<String>,

    /// Print registry and limit events: all, configure, resource, module, trace
    #[arg(long, global = true, value_delimiter = ',')]
    log_events: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered formats
    #[command(visible_alias = "ls")]
    Formats(FormatsArgs),

    /// Show the descriptor of one format
    #[command(visible_alias = "f")]
    Format(FormatArgs),

    /// Display image header information
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// Show resource limits in effect
    Limits(LimitsArgs),

    /// Show version, features and compiled header probers
    Version,
}

#[derive(Args)]
struct FormatsArgs {
    /// Only formats that can be read
    #[arg(short, long)]
    readable: bool,

    /// Only formats that can be written
    #[arg(short, long)]
    writable: bool,

    /// Only formats that hold multiple frames
    #[arg(short, long)]
    multi_frame: bool,

    /// Only formats handled by this module, e.g. PNG
    #[arg(long)]
    module: Option<String>,

    /// Machine-readable output (JSON)
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct FormatArgs {
    /// Format name (PNG, 3FR) or a file path to resolve by extension
    target: String,

    /// Classify the file by its header bytes instead of its extension
    #[arg(long)]
    header: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Input image(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Show every frame of multi-frame images
    #[arg(short, long)]
    frames: bool,

    /// Machine-readable output (JSON)
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct LimitsArgs {
    /// Print as a policy document (YAML)
    #[arg(long)]
    yaml: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let events = parse_log_events(&cli.log_events)?;
    if !events.is_empty() {
        log::subscribe(|event| eprintln!("[{}] {}", event.kind, event.message));
        log::set_log_events(events);
    }

    environment::initialize().context("Failed to initialize from environment")?;
    if let Some(dir) = &cli.config {
        environment::initialize_with_path(dir)
            .with_context(|| format!("Failed to load policy from {}", dir.display()))?;
    }
    if let Some(percent) = cli.memory_percent {
        ResourceLimits::global()
            .limit_memory(Percentage::new(percent))
            .context("Invalid --memory-percent")?;
    }
    for assignment in &cli.limits {
        let (resource, value) = environment::apply_limit_assignment(assignment)
            .with_context(|| format!("Invalid --limit '{assignment}'"))?;
        debug!(%resource, value, "limit set from command line");
    }

    match cli.command {
        Commands::Formats(args) => commands::formats::run(args, cli.verbose),
        Commands::Format(args) => commands::format::run(args, cli.verbose),
        Commands::Info(args) => commands::info::run(args, cli.verbose),
        Commands::Limits(args) => commands::limits::run(args, cli.verbose),
        Commands::Version => commands::version::run(cli.verbose),
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug output.
fn init_tracing(verbose: bool) {
    let default = if verbose { "imkit_io=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_log_events(names: &[String]) -> Result<LogEvents> {
    let mut events = LogEvents::NONE;
    for name in names {
        events |= match name.trim().to_ascii_lowercase().as_str() {
            "all" => LogEvents::ALL,
            "detailed" => LogEvents::DETAILED,
            "configure" => LogEvents::CONFIGURE,
            "resource" => LogEvents::RESOURCE,
            "module" => LogEvents::MODULE,
            "trace" => LogEvents::TRACE,
            "none" | "" => LogEvents::NONE,
            other => anyhow::bail!("Unknown log event kind '{other}'"),
        };
    }
    Ok(events)
}
