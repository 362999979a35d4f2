//! Process-wide initialization and build information.
//!
//! # Configure directory
//!
//! A configure directory holds `policy.yaml` (see [`crate::config`]).
//! [`initialize_with_path`] loads and applies it; [`initialize`] does the
//! same for `IMKIT_CONFIGURE_PATH` and then applies the `IMKIT_*_LIMIT`
//! environment overrides on top.
//!
//! # Environment Variables
//!
//! - `IMKIT_CONFIGURE_PATH` - configure directory read by [`initialize`]
//! - `IMKIT_<LIMIT>_LIMIT` - one per [`ResourceType`], e.g. `IMKIT_WIDTH_LIMIT`
//! - `IMKIT_MEMORY_PERCENT` - share of system memory, also sets area

use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use imkit_core::{FormatDescriptor, QuantumDepth};
use tracing::{debug, info};

use crate::config::{POLICY_FILE, Policy, ResourcePolicy};
use crate::info::probers;
use crate::limits::{ResourceLimits, ResourceType};
use crate::log::{self, LogEvents};
use crate::registry::FormatRegistry;
use crate::{IoError, IoResult};

/// Environment variable naming the configure directory.
pub const CONFIGURE_PATH_VAR: &str = "IMKIT_CONFIGURE_PATH";

static CONFIGURE_PATH: RwLock<Option<PathBuf>> = RwLock::new(None);
static TEMP_DIRECTORY: RwLock<Option<PathBuf>> = RwLock::new(None);
static POLICY_DIRS: AtomicU64 = AtomicU64::new(0);

/// Version string, e.g. `"imkit 0.1.0 Q16"`.
pub fn version() -> String {
    format!("imkit {} {}", env!("CARGO_PKG_VERSION"), QuantumDepth::CURRENT)
}

/// Space-separated list of compiled features.
pub fn features() -> String {
    let mut features = vec![QuantumDepth::CURRENT.name()];
    if QuantumDepth::CURRENT.is_hdri() {
        features.push("HDRI");
    }
    features.push("Threads");
    features.push("Policy");
    features.join(" ")
}

/// Space-separated list of header probers compiled in.
pub fn delegates() -> String {
    probers().join(" ")
}

/// Snapshot of every format in the global registry.
pub fn supported_formats() -> IoResult<Vec<Arc<FormatDescriptor>>> {
    FormatRegistry::global().all()
}

/// Initializes from the process environment.
///
/// Loads the configure directory named by `IMKIT_CONFIGURE_PATH`, if set,
/// then applies limit overrides from `IMKIT_*` variables.
pub fn initialize() -> IoResult<()> {
    if let Some(dir) = env::var_os(CONFIGURE_PATH_VAR) {
        initialize_with_path(dir)?;
    }

    let overrides = ResourcePolicy::from_env()?;
    if !overrides.is_empty() {
        let applied = ResourceLimits::global().apply_policy(&overrides)?;
        debug!(applied, "applied environment limit overrides");
        log::emit(LogEvents::CONFIGURE, format!("applied {applied} limits from environment"));
    }
    Ok(())
}

/// Loads and applies `policy.yaml` from `dir`, then records `dir` as the
/// configure path.
///
/// `dir` must be an existing directory (argument error otherwise); a
/// missing policy file is [`IoError::ConfigNotFound`].
pub fn initialize_with_path<P: AsRef<Path>>(dir: P) -> IoResult<()> {
    let dir = check_directory(dir.as_ref())?;
    let file = dir.join(POLICY_FILE);
    if !file.is_file() {
        return Err(IoError::ConfigNotFound { path: file });
    }

    let policy = Policy::from_file(&file)?;
    apply_policy(&policy)?;
    *CONFIGURE_PATH.write().unwrap_or_else(|e| e.into_inner()) = Some(dir.clone());

    info!(path = %dir.display(), "initialized from configure directory");
    log::emit(LogEvents::CONFIGURE, format!("configure path set to {}", dir.display()));
    Ok(())
}

/// Writes `policy` to a fresh directory under [`temp_directory`] and
/// initializes from it. Returns the directory.
pub fn initialize_with_policy(policy: &Policy) -> IoResult<PathBuf> {
    let n = POLICY_DIRS.fetch_add(1, Ordering::Relaxed);
    let dir = temp_directory().join(format!("imkit-{}-{n}", std::process::id()));
    initialize_with_policy_in(policy, &dir)?;
    Ok(dir)
}

/// Writes `policy` to `dir` (created if needed) and initializes from it.
pub fn initialize_with_policy_in<P: AsRef<Path>>(policy: &Policy, dir: P) -> IoResult<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    policy.write(dir.join(POLICY_FILE))?;
    initialize_with_path(dir)
}

/// Applies a policy to the global limits and registry.
pub fn apply_policy(policy: &Policy) -> IoResult<()> {
    let disabled = policy.disabled()?;
    ResourceLimits::global().apply_policy(&policy.resources)?;

    let registry = FormatRegistry::global();
    for format in disabled {
        if registry.unregister(format)? {
            debug!(%format, "disabled by policy");
        }
    }
    Ok(())
}

/// Configure directory of the last successful initialization.
pub fn configure_path() -> Option<PathBuf> {
    CONFIGURE_PATH.read().ok().and_then(|p| p.clone())
}

/// Sets the directory used for temporary files. It must exist.
pub fn set_temp_directory<P: AsRef<Path>>(dir: P) -> IoResult<()> {
    let dir = check_directory(dir.as_ref())?;
    log::emit(LogEvents::CONFIGURE, format!("temporary path set to {}", dir.display()));
    *TEMP_DIRECTORY.write().unwrap_or_else(|e| e.into_inner()) = Some(dir);
    Ok(())
}

/// Directory used for temporary files: the one set with
/// [`set_temp_directory`], or the system default.
pub fn temp_directory() -> PathBuf {
    TEMP_DIRECTORY
        .read()
        .ok()
        .and_then(|p| p.clone())
        .unwrap_or_else(env::temp_dir)
}

/// Applies a `name=value` limit assignment, e.g. `width=16000`.
pub fn apply_limit_assignment(assignment: &str) -> IoResult<(ResourceType, u64)> {
    let (name, value) = assignment
        .split_once('=')
        .ok_or_else(|| IoError::invalid_argument("limit", format!("expected name=value, got '{assignment}'")))?;
    let resource: ResourceType = name.trim().parse()?;
    let value: u64 = value
        .trim()
        .parse()
        .map_err(|e| IoError::invalid_argument("limit", format!("'{value}': {e}")))?;
    ResourceLimits::global().set(resource, value);
    Ok((resource, value))
}

fn check_directory(path: &Path) -> IoResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(IoError::invalid_argument("path", "must not be empty"));
    }
    let path = std::path::absolute(path)?;
    if !path.is_dir() {
        return Err(IoError::invalid_argument(
            "path",
            format!("unable to find directory: {}", path.display()),
        ));
    }
    Ok(path)
}
