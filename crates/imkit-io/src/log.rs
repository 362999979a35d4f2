//! Log event subscription.
//!
//! Every event goes to [`tracing`]. In addition, callers can register
//! handlers that receive events of the kinds selected by
//! [`set_log_events`]. Fan-out happens only while at least one handler is
//! subscribed: the first subscription switches the shared sink on and the
//! last unsubscription switches it off.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use imkit_io::log::{self, LogEvents};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let id = log::subscribe(move |event| sink.lock().unwrap().push(event.message.clone()));
//!
//! log::set_log_events(LogEvents::ALL);
//! log::emit(LogEvents::CONFIGURE, "hello");
//! assert!(log::unsubscribe(id));
//! assert!(seen.lock().unwrap().iter().any(|m| m == "hello"));
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Set of log event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LogEvents(u32);

impl LogEvents {
    /// No events.
    pub const NONE: Self = Self(0);
    /// Configuration and initialization.
    pub const CONFIGURE: Self = Self(1 << 0);
    /// Resource limit changes.
    pub const RESOURCE: Self = Self(1 << 1);
    /// Format registry and module loading.
    pub const MODULE: Self = Self(1 << 2);
    /// Fine-grained tracing.
    pub const TRACE: Self = Self(1 << 3);
    /// Every kind except [`Self::TRACE`].
    pub const ALL: Self = Self(Self::CONFIGURE.0 | Self::RESOURCE.0 | Self::MODULE.0);
    /// Every kind.
    pub const DETAILED: Self = Self(Self::ALL.0 | Self::TRACE.0);

    /// Raw bit representation.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every kind in `other` is also in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `self` and `other` share any kind.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether no kind is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LogEvents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LogEvents {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for LogEvents {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for LogEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::CONFIGURE, "Configure"),
            (Self::RESOURCE, "Resource"),
            (Self::MODULE, "Module"),
            (Self::TRACE, "Trace"),
        ];
        let parts: Vec<&str> = names
            .iter()
            .filter(|(kind, _)| self.contains(*kind))
            .map(|(_, name)| *name)
            .collect();
        if parts.is_empty() {
            f.write_str("None")
        } else {
            f.write_str(&parts.join(","))
        }
    }
}

/// One delivered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Kind of the event.
    pub kind: LogEvents,
    /// Message text.
    pub message: String,
}

/// Handle returned by [`subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&LogEvent) + Send + Sync>;

static SUBSCRIBERS: RwLock<Vec<(SubscriptionId, Handler)>> = RwLock::new(Vec::new());
static SINK_ACTIVE: AtomicBool = AtomicBool::new(false);
static MASK: AtomicU32 = AtomicU32::new(LogEvents::NONE.bits());
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Registers `handler` for log events.
pub fn subscribe<F>(handler: F) -> SubscriptionId
where
    F: Fn(&LogEvent) + Send + Sync + 'static,
{
    let id = SubscriptionId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    let mut subs = SUBSCRIBERS.write().unwrap_or_else(|e| e.into_inner());
    subs.push((id, Arc::new(handler)));
    if subs.len() == 1 {
        SINK_ACTIVE.store(true, Ordering::Release);
    }
    id
}

/// Removes a handler. Returns `false` if `id` was not subscribed.
pub fn unsubscribe(id: SubscriptionId) -> bool {
    let mut subs = SUBSCRIBERS.write().unwrap_or_else(|e| e.into_inner());
    let before = subs.len();
    subs.retain(|(sid, _)| *sid != id);
    let removed = subs.len() != before;
    if removed && subs.is_empty() {
        SINK_ACTIVE.store(false, Ordering::Release);
    }
    removed
}

/// Number of registered handlers.
pub fn subscriber_count() -> usize {
    SUBSCRIBERS.read().map_or(0, |subs| subs.len())
}

/// Whether the shared sink is switched on.
pub fn is_sink_active() -> bool {
    SINK_ACTIVE.load(Ordering::Acquire)
}

/// Selects which kinds are delivered to handlers.
pub fn set_log_events(events: LogEvents) {
    MASK.store(events.bits(), Ordering::Relaxed);
    tracing::debug!(events = %events, "log events set");
}

/// Currently selected kinds.
pub fn log_events() -> LogEvents {
    LogEvents(MASK.load(Ordering::Relaxed))
}

/// Emits an event to `tracing` and, when selected, to every handler.
pub fn emit(kind: LogEvents, message: impl Into<String>) {
    let message = message.into();
    if kind.contains(LogEvents::TRACE) {
        tracing::trace!(kind = %kind, "{message}");
    } else {
        tracing::debug!(kind = %kind, "{message}");
    }

    if !is_sink_active() || !log_events().intersects(kind) {
        return;
    }

    // Handlers run outside the lock so they may subscribe or unsubscribe.
    let handlers: Vec<Handler> = match SUBSCRIBERS.read() {
        Ok(subs) => subs.iter().map(|(_, h)| Arc::clone(h)).collect(),
        Err(_) => return,
    };
    let event = LogEvent { kind, message };
    for handler in handlers {
        handler(&event);
    }
}
