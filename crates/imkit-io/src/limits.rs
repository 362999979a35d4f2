//! Resource limit governor.
//!
//! Ten named process-wide ceilings, each held in its own atomic slot:
//!
//! | Limit | Unit | Default |
//! |-------|------|---------|
//! | `area` | pixels | 4 x `memory` |
//! | `disk` | bytes | unlimited |
//! | `height` | pixels | unlimited |
//! | `width` | pixels | unlimited |
//! | `list_length` | images | unlimited |
//! | `max_memory_request` | bytes | `memory` |
//! | `memory` | bytes | total system memory |
//! | `thread` | threads | available parallelism |
//! | `throttle` | milliseconds | 0 |
//! | `time` | seconds | unlimited |
//!
//! Writes to different slots are independent. The one coupling is
//! [`ResourceLimits::limit_memory`], which sets `memory` and `area`
//! together, with area at exactly four times memory.
//!
//! # Environment Variables
//!
//! [`ResourceType::env_var`] names the override read by
//! [`crate::initialize`], e.g. `IMKIT_WIDTH_LIMIT`. `IMKIT_MEMORY_PERCENT`
//! applies [`ResourceLimits::limit_memory`].

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use imkit_core::Percentage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResourcePolicy;
use crate::log::{self, LogEvents};
use crate::{IoError, IoResult};

/// Fallback when total memory cannot be detected: 8 GiB.
pub const FALLBACK_MEMORY: u64 = 8 * 1024 * 1024 * 1024;

/// Ratio of the area limit to the memory limit.
pub const AREA_PER_MEMORY: u64 = 4;

static SYSTEM_MEMORY: OnceLock<u64> = OnceLock::new();

/// Total system RAM in bytes.
pub fn system_memory() -> u64 {
    *SYSTEM_MEMORY.get_or_init(|| {
        sys_info::mem_info()
            .map(|m| m.total * 1024) // KB to bytes
            .unwrap_or(FALLBACK_MEMORY)
    })
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{bytes} B")
    }
}

/// Named resource limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    /// Maximum pixel area of one image.
    Area,
    /// Maximum disk space for the pixel cache.
    Disk,
    /// Maximum image height.
    Height,
    /// Maximum image width.
    Width,
    /// Maximum number of images in a collection.
    ListLength,
    /// Maximum size of a single memory request.
    MaxMemoryRequest,
    /// Maximum memory for the pixel cache.
    Memory,
    /// Maximum number of worker threads.
    Thread,
    /// Pause between operations, in milliseconds.
    Throttle,
    /// Maximum elapsed time, in seconds.
    Time,
}

impl ResourceType {
    /// Every limit, in slot order.
    pub const ALL: [ResourceType; 10] = [
        Self::Area,
        Self::Disk,
        Self::Height,
        Self::Width,
        Self::ListLength,
        Self::MaxMemoryRequest,
        Self::Memory,
        Self::Thread,
        Self::Throttle,
        Self::Time,
    ];

    /// Snake-case name, e.g. `"list_length"`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Area => "area",
            Self::Disk => "disk",
            Self::Height => "height",
            Self::Width => "width",
            Self::ListLength => "list_length",
            Self::MaxMemoryRequest => "max_memory_request",
            Self::Memory => "memory",
            Self::Thread => "thread",
            Self::Throttle => "throttle",
            Self::Time => "time",
        }
    }

    /// Environment variable overriding this limit.
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::Area => "IMKIT_AREA_LIMIT",
            Self::Disk => "IMKIT_DISK_LIMIT",
            Self::Height => "IMKIT_HEIGHT_LIMIT",
            Self::Width => "IMKIT_WIDTH_LIMIT",
            Self::ListLength => "IMKIT_LIST_LENGTH_LIMIT",
            Self::MaxMemoryRequest => "IMKIT_MAX_MEMORY_REQUEST_LIMIT",
            Self::Memory => "IMKIT_MEMORY_LIMIT",
            Self::Thread => "IMKIT_THREAD_LIMIT",
            Self::Throttle => "IMKIT_THROTTLE_LIMIT",
            Self::Time => "IMKIT_TIME_LIMIT",
        }
    }

    /// Whether the value is a byte count.
    pub const fn is_bytes(self) -> bool {
        matches!(self, Self::Disk | Self::MaxMemoryRequest | Self::Memory)
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceType {
    type Err = IoError;

    /// Accepts `list_length`, `list-length` and `ListLength` spellings.
    fn from_str(s: &str) -> IoResult<Self> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect();
        Self::ALL
            .into_iter()
            .find(|r| r.name().replace('_', "").eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| IoError::invalid_argument("resource", format!("unknown limit '{s}'")))
    }
}

/// Values of every limit at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsSnapshot {
    /// Area limit.
    pub area: u64,
    /// Disk limit.
    pub disk: u64,
    /// Height limit.
    pub height: u64,
    /// Width limit.
    pub width: u64,
    /// List length limit.
    pub list_length: u64,
    /// Max memory request limit.
    pub max_memory_request: u64,
    /// Memory limit.
    pub memory: u64,
    /// Thread limit.
    pub thread: u64,
    /// Throttle.
    pub throttle: u64,
    /// Time limit.
    pub time: u64,
}

impl LimitsSnapshot {
    /// Value of one limit.
    pub fn get(&self, resource: ResourceType) -> u64 {
        match resource {
            ResourceType::Area => self.area,
            ResourceType::Disk => self.disk,
            ResourceType::Height => self.height,
            ResourceType::Width => self.width,
            ResourceType::ListLength => self.list_length,
            ResourceType::MaxMemoryRequest => self.max_memory_request,
            ResourceType::Memory => self.memory,
            ResourceType::Thread => self.thread,
            ResourceType::Throttle => self.throttle,
            ResourceType::Time => self.time,
        }
    }

    /// `(limit, value)` pairs in slot order.
    pub fn entries(&self) -> impl Iterator<Item = (ResourceType, u64)> + '_ {
        ResourceType::ALL.into_iter().map(|r| (r, self.get(r)))
    }
}

/// Process-wide resource ceilings.
///
/// ```rust
/// use imkit_core::Percentage;
/// use imkit_io::{ResourceLimits, ResourceType};
///
/// let limits = ResourceLimits::new();
/// limits.set_width(16_000);
/// assert_eq!(limits.get(ResourceType::Width), 16_000);
///
/// limits.limit_memory(Percentage::new(50.0)).unwrap();
/// assert_eq!(limits.area(), 4 * limits.memory());
/// ```
#[derive(Debug)]
pub struct ResourceLimits {
    slots: [AtomicU64; 10],
}

impl ResourceLimits {
    /// Creates a governor holding the default values.
    pub fn new() -> Self {
        let memory = system_memory();
        let threads = std::thread::available_parallelism()
            .map(|n| n.get() as u64)
            .unwrap_or(1);

        let limits = Self {
            slots: std::array::from_fn(|_| AtomicU64::new(u64::MAX)),
        };
        limits.store(ResourceType::Memory, memory);
        limits.store(ResourceType::Area, memory.saturating_mul(AREA_PER_MEMORY));
        limits.store(ResourceType::MaxMemoryRequest, memory);
        limits.store(ResourceType::Thread, threads);
        limits.store(ResourceType::Throttle, 0);
        limits
    }

    /// Returns the process-wide governor.
    pub fn global() -> &'static ResourceLimits {
        static INSTANCE: OnceLock<ResourceLimits> = OnceLock::new();
        INSTANCE.get_or_init(ResourceLimits::new)
    }

    /// Current value of `resource`.
    #[inline]
    pub fn get(&self, resource: ResourceType) -> u64 {
        self.slots[resource.slot()].load(Ordering::Relaxed)
    }

    /// Sets `resource`. No range validation beyond `u64`.
    pub fn set(&self, resource: ResourceType, value: u64) {
        self.store(resource, value);
        debug!(resource = resource.name(), value, "resource limit set");
        log::emit(LogEvents::RESOURCE, format!("{resource} limit set to {value}"));
    }

    fn store(&self, resource: ResourceType, value: u64) {
        self.slots[resource.slot()].store(value, Ordering::Relaxed);
    }

    /// Area limit in pixels.
    pub fn area(&self) -> u64 {
        self.get(ResourceType::Area)
    }

    /// Sets the area limit.
    pub fn set_area(&self, value: u64) {
        self.set(ResourceType::Area, value);
    }

    /// Disk limit in bytes.
    pub fn disk(&self) -> u64 {
        self.get(ResourceType::Disk)
    }

    /// Sets the disk limit.
    pub fn set_disk(&self, value: u64) {
        self.set(ResourceType::Disk, value);
    }

    /// Height limit in pixels.
    pub fn height(&self) -> u64 {
        self.get(ResourceType::Height)
    }

    /// Sets the height limit.
    pub fn set_height(&self, value: u64) {
        self.set(ResourceType::Height, value);
    }

    /// Width limit in pixels.
    pub fn width(&self) -> u64 {
        self.get(ResourceType::Width)
    }

    /// Sets the width limit.
    pub fn set_width(&self, value: u64) {
        self.set(ResourceType::Width, value);
    }

    /// Maximum images per collection.
    pub fn list_length(&self) -> u64 {
        self.get(ResourceType::ListLength)
    }

    /// Sets the list length limit.
    pub fn set_list_length(&self, value: u64) {
        self.set(ResourceType::ListLength, value);
    }

    /// Largest single memory request in bytes.
    pub fn max_memory_request(&self) -> u64 {
        self.get(ResourceType::MaxMemoryRequest)
    }

    /// Sets the largest single memory request.
    pub fn set_max_memory_request(&self, value: u64) {
        self.set(ResourceType::MaxMemoryRequest, value);
    }

    /// Memory limit in bytes.
    pub fn memory(&self) -> u64 {
        self.get(ResourceType::Memory)
    }

    /// Sets the memory limit. Does not touch the area limit.
    pub fn set_memory(&self, value: u64) {
        self.set(ResourceType::Memory, value);
    }

    /// Worker thread limit.
    pub fn thread(&self) -> u64 {
        self.get(ResourceType::Thread)
    }

    /// Sets the worker thread limit.
    pub fn set_thread(&self, value: u64) {
        self.set(ResourceType::Thread, value);
    }

    /// Throttle in milliseconds.
    pub fn throttle(&self) -> u64 {
        self.get(ResourceType::Throttle)
    }

    /// Sets the throttle.
    pub fn set_throttle(&self, value: u64) {
        self.set(ResourceType::Throttle, value);
    }

    /// Time limit in seconds.
    pub fn time(&self) -> u64 {
        self.get(ResourceType::Time)
    }

    /// Sets the time limit.
    pub fn set_time(&self, value: u64) {
        self.set(ResourceType::Time, value);
    }

    /// Limits memory to a share of total system memory and sets the area
    /// limit to four times that.
    ///
    /// Fails with an argument error unless `percentage` is within
    /// `[0, 100]`; no limit changes in that case.
    pub fn limit_memory(&self, percentage: Percentage) -> IoResult<()> {
        let percentage = Percentage::ratio(percentage.value())?;
        let memory = percentage.of(system_memory());

        self.set(ResourceType::Memory, memory);
        self.set(ResourceType::Area, memory.saturating_mul(AREA_PER_MEMORY));
        debug!(%percentage, memory, "memory limited to share of system memory");
        Ok(())
    }

    /// Same as [`Self::limit_memory`] with a fraction (`0.5` is half).
    pub fn set_memory_limit_by_fraction(&self, fraction: f64) -> IoResult<()> {
        self.limit_memory(Percentage::from_fraction(fraction))
    }

    /// Rejects dimensions above the width, height or area limits.
    pub fn check_dimensions(&self, width: u64, height: u64) -> IoResult<()> {
        check(ResourceType::Width, width, self.width())?;
        check(ResourceType::Height, height, self.height())?;
        check(ResourceType::Area, width.saturating_mul(height), self.area())
    }

    /// Rejects collections longer than the list length limit.
    pub fn check_list_length(&self, len: u64) -> IoResult<()> {
        check(ResourceType::ListLength, len, self.list_length())
    }

    /// Rejects single allocations larger than the max memory request limit.
    pub fn check_memory_request(&self, bytes: u64) -> IoResult<()> {
        check(ResourceType::MaxMemoryRequest, bytes, self.max_memory_request())
    }

    /// Reads every limit.
    pub fn snapshot(&self) -> LimitsSnapshot {
        LimitsSnapshot {
            area: self.area(),
            disk: self.disk(),
            height: self.height(),
            width: self.width(),
            list_length: self.list_length(),
            max_memory_request: self.max_memory_request(),
            memory: self.memory(),
            thread: self.thread(),
            throttle: self.throttle(),
            time: self.time(),
        }
    }

    /// Applies a policy: `memory_percent` first, then every explicit value.
    ///
    /// Returns the number of limits written.
    pub fn apply_policy(&self, policy: &ResourcePolicy) -> IoResult<usize> {
        let mut applied = 0;
        if let Some(percent) = policy.memory_percent {
            self.limit_memory(Percentage::new(percent))?;
            applied += 2;
        }
        for (resource, value) in policy.entries() {
            self.set(resource, value);
            applied += 1;
        }
        Ok(applied)
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::new()
    }
}

fn check(resource: ResourceType, value: u64, limit: u64) -> IoResult<()> {
    if value > limit {
        return Err(IoError::LimitExceeded {
            resource: resource.name(),
            value,
            limit,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = ResourceLimits::new();
        assert_eq!(limits.memory(), system_memory());
        assert_eq!(limits.area(), limits.memory() * AREA_PER_MEMORY);
        assert_eq!(limits.max_memory_request(), limits.memory());
        assert_eq!(limits.width(), u64::MAX);
        assert_eq!(limits.time(), u64::MAX);
        assert_eq!(limits.throttle(), 0);
        assert!(limits.thread() >= 1);
    }

    #[test]
    fn test_set_get_every_slot() {
        let limits = ResourceLimits::new();
        for (i, resource) in ResourceType::ALL.into_iter().enumerate() {
            limits.set(resource, 1000 + i as u64);
        }
        for (i, resource) in ResourceType::ALL.into_iter().enumerate() {
            assert_eq!(limits.get(resource), 1000 + i as u64, "{resource}");
        }
        limits.set_height(0);
        assert_eq!(limits.height(), 0);
        limits.set_disk(u64::MAX);
        assert_eq!(limits.disk(), u64::MAX);
    }

    #[test]
    fn test_setting_memory_does_not_touch_area() {
        let limits = ResourceLimits::new();
        let area = limits.area();
        limits.set_memory(1234);
        assert_eq!(limits.area(), area);
    }

    #[test]
    fn test_limit_memory_couples_area() {
        let limits = ResourceLimits::new();
        limits.limit_memory(Percentage::new(50.0)).unwrap();
        assert_eq!(limits.memory(), system_memory() / 2);
        assert_eq!(limits.area(), 4 * limits.memory());

        limits.limit_memory(Percentage::new(0.0)).unwrap();
        assert_eq!(limits.memory(), 0);
        assert_eq!(limits.area(), 0);

        limits.limit_memory(Percentage::new(100.0)).unwrap();
        assert_eq!(limits.memory(), system_memory());
    }

    #[test]
    fn test_limit_memory_rejects_out_of_range() {
        let limits = ResourceLimits::new();
        limits.set_memory(77);
        limits.set_area(88);
        for bad in [-0.1, 100.1, f64::NAN, f64::INFINITY] {
            let err = limits.limit_memory(Percentage::new(bad)).unwrap_err();
            assert!(err.is_invalid_argument(), "{bad}");
        }
        assert_eq!(limits.memory(), 77);
        assert_eq!(limits.area(), 88);
    }

    #[test]
    fn test_fraction_setter() {
        let limits = ResourceLimits::new();
        limits.set_memory_limit_by_fraction(0.25).unwrap();
        assert_eq!(limits.memory(), Percentage::new(25.0).of(system_memory()));
        assert_eq!(limits.area(), 4 * limits.memory());
        assert!(limits.set_memory_limit_by_fraction(1.5).is_err());
    }

    #[test]
    fn test_check_memory_request() {
        let limits = ResourceLimits::new();
        limits.set_max_memory_request(4096);
        assert!(limits.check_memory_request(4096).is_ok());
        assert!(matches!(
            limits.check_memory_request(4097),
            Err(IoError::LimitExceeded { resource: "max_memory_request", value: 4097, limit: 4096 })
        ));
    }

    #[test]
    fn test_checks() {
        let limits = ResourceLimits::new();
        limits.set_width(100);
        limits.set_height(50);
        assert!(limits.check_dimensions(100, 50).is_ok());

        let err = limits.check_dimensions(101, 1).unwrap_err();
        assert!(matches!(err, IoError::LimitExceeded { resource: "width", value: 101, limit: 100 }));

        limits.set_area(10);
        assert!(matches!(
            limits.check_dimensions(5, 5),
            Err(IoError::LimitExceeded { resource: "area", .. })
        ));

        limits.set_list_length(3);
        assert!(limits.check_list_length(3).is_ok());
        assert!(limits.check_list_length(4).is_err());
    }

    #[test]
    fn test_resource_type_parse() {
        assert_eq!("list_length".parse::<ResourceType>().unwrap(), ResourceType::ListLength);
        assert_eq!("List-Length".parse::<ResourceType>().unwrap(), ResourceType::ListLength);
        assert_eq!("MaxMemoryRequest".parse::<ResourceType>().unwrap(), ResourceType::MaxMemoryRequest);
        assert!("bogus".parse::<ResourceType>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_snapshot_entries() {
        let limits = ResourceLimits::new();
        limits.set_time(60);
        let snap = limits.snapshot();
        assert_eq!(snap.get(ResourceType::Time), 60);
        assert_eq!(snap.entries().count(), 10);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2 KB");
        assert_eq!(format_bytes(8 * 1024 * 1024 * 1024), "8.00 GB");
    }
}
