//! Integration tests for configure directories and policy files.

use std::fs;
use std::sync::{Arc, Mutex};

use imkit_core::ImageFormat;
use imkit_io::config::POLICY_FILE;
use imkit_io::log::{self, LogEvents};
use imkit_io::{
    FormatRegistry, IoError, Policy, ResourceLimits, ResourcePolicy, ResourceType, configure_path,
    initialize_with_path, initialize_with_policy, set_temp_directory, temp_directory,
};
use tempfile::TempDir;

// Tests in this file share the global limits, registry and log sink.
static GUARD: Mutex<()> = Mutex::new(());

fn lock() -> std::sync::MutexGuard<'static, ()> {
    GUARD.lock().unwrap_or_else(|e| e.into_inner())
}

#[test]
fn policy_configure_directory_is_applied() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(POLICY_FILE),
        "resources:\n  width: 4096\n  height: 2048\ndisabled_formats:\n  - PS\n  - EPS\n",
    )
    .unwrap();

    initialize_with_path(dir.path()).unwrap();

    let limits = ResourceLimits::global();
    assert_eq!(limits.width(), 4096);
    assert_eq!(limits.height(), 2048);

    let registry = FormatRegistry::global();
    assert!(registry.get(ImageFormat::Ps).unwrap().is_none());
    assert!(registry.get(ImageFormat::Eps).unwrap().is_none());
    assert!(registry.get_by_header(b"%!PS-Adobe-3.0\n").unwrap().is_none());
    assert!(registry.get(ImageFormat::Pdf).unwrap().is_some());

    let configured = configure_path().unwrap();
    assert_eq!(configured.canonicalize().unwrap(), dir.path().canonicalize().unwrap());
}

#[test]
fn policy_missing_file_changes_nothing() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();
    let before = ResourceLimits::global().snapshot();

    match initialize_with_path(dir.path()) {
        Err(IoError::ConfigNotFound { path }) => assert_eq!(path.file_name().unwrap(), POLICY_FILE),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(ResourceLimits::global().snapshot(), before);
}

#[test]
fn policy_bad_directory_is_argument_error() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing");

    assert!(initialize_with_path("").unwrap_err().is_invalid_argument());
    assert!(initialize_with_path(&missing).unwrap_err().is_invalid_argument());
    assert!(set_temp_directory(&missing).unwrap_err().is_invalid_argument());
}

#[test]
fn policy_bad_document_is_rejected_before_applying() {
    let _guard = lock();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(POLICY_FILE),
        "resources:\n  width: 1\ndisabled_formats:\n  - NOT_A_FORMAT\n",
    )
    .unwrap();

    let before = ResourceLimits::global().snapshot();
    assert!(initialize_with_path(dir.path()).is_err());
    assert_eq!(ResourceLimits::global().snapshot(), before);
}

#[test]
fn policy_written_to_temp_directory() {
    let _guard = lock();
    let temp = TempDir::new().unwrap();
    set_temp_directory(temp.path()).unwrap();
    assert_eq!(
        temp_directory().canonicalize().unwrap(),
        temp.path().canonicalize().unwrap()
    );

    let policy = Policy::default()
        .with_resources(ResourcePolicy::default().with(ResourceType::ListLength, 3))
        .disable(ImageFormat::Xbm);
    let dir = initialize_with_policy(&policy).unwrap();

    assert!(dir.starts_with(temp_directory()));
    assert_eq!(Policy::from_file(dir.join(POLICY_FILE)).unwrap(), policy);
    assert_eq!(ResourceLimits::global().list_length(), 3);
    assert!(FormatRegistry::global().get(ImageFormat::Xbm).unwrap().is_none());
}

#[test]
fn policy_emits_configure_events() {
    let _guard = lock();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = log::subscribe(move |event| {
        sink.lock().unwrap().push((event.kind, event.message.clone()));
    });
    log::set_log_events(LogEvents::ALL);

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(POLICY_FILE), "resources:\n  thread: 2\n").unwrap();
    initialize_with_path(dir.path()).unwrap();

    log::set_log_events(LogEvents::NONE);
    assert!(log::unsubscribe(id));

    let seen = seen.lock().unwrap();
    assert!(seen.iter().any(|(kind, msg)| *kind == LogEvents::RESOURCE && msg.contains("thread")));
    assert!(seen.iter().any(|(kind, msg)| *kind == LogEvents::CONFIGURE && msg.contains("configure path")));
}
