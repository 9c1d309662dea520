//! # Events emitted by the supervision tree.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Group events**: creation, destruction, daemon/ceiling changes
//! - **Unit lifecycle events**: creation, start, start failure, termination
//! - **Signal and failure events**: bulk signals, unhandled failures
//! - **Runtime events**: shutdown progress and subscriber health
//!
//! The [`Event`] struct carries additional metadata such as timestamps, group
//! and unit names, reasons, and priorities.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use groupvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::UnitStartFailed)
//!     .with_group("workers")
//!     .with_unit("worker-1")
//!     .with_reason("no capacity");
//!
//! assert_eq!(ev.kind, EventKind::UnitStartFailed);
//! assert_eq!(ev.group.as_deref(), Some("workers"));
//! assert_eq!(ev.reason.as_deref(), Some("no capacity"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::group::Signal;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of tree events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Group events ===
    /// Group was created and attached to its parent.
    ///
    /// Sets: `group`, `priority` (inherited ceiling)
    GroupCreated,

    /// Group was destroyed (explicitly or by daemon auto-destroy).
    ///
    /// Sets: `group`, `reason` (`"explicit"` or `"daemon_empty"`)
    GroupDestroyed,

    /// Group daemon flag changed.
    ///
    /// Sets: `group`, `reason` (`"on"` / `"off"`)
    DaemonChanged,

    /// Group priority ceiling was (re)applied.
    ///
    /// Sets: `group`, `priority` (effective ceiling)
    CeilingChanged,

    // === Unit lifecycle events ===
    /// Unit was constructed and reserved an unstarted slot.
    ///
    /// Sets: `group`, `unit`, `unit_id`, `priority`
    UnitCreated,

    /// Substrate began executing the unit.
    ///
    /// Sets: `group`, `unit`, `unit_id`
    UnitStarted,

    /// Substrate refused to begin the unit; bookkeeping was rolled back.
    ///
    /// Sets: `group`, `unit`, `unit_id`, `reason`
    UnitStartFailed,

    /// Unit terminated and left its group.
    ///
    /// Sets: `group`, `unit`, `unit_id`
    UnitTerminated,

    // === Signal and failure events ===
    /// A bulk signal was requested on a subtree.
    ///
    /// Sets: `group` (subtree root), `signal`
    SignalRequested,

    /// A failure reached the fallback policy (no handler anywhere on the chain).
    ///
    /// Sets: `group`, `unit`, `unit_id`, `reason` (failure description and trace)
    FailureUnhandled,

    // === Runtime events ===
    /// Shutdown requested (explicit call or OS signal).
    ShutdownRequested,

    /// All units terminated within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some units were still alive.
    ///
    /// Sets: `reason` (stuck unit names)
    GraceExceeded,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason` (subscriber name and cause)
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (subscriber name and panic info)
    SubscriberPanicked,
}

/// Tree event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the group, if applicable.
    pub group: Option<Arc<str>>,
    /// Name of the unit, if applicable.
    pub unit: Option<Arc<str>>,
    /// Stable id of the unit, if applicable.
    pub unit_id: Option<u64>,
    /// Human-readable reason (errors, destroy cause, failure text).
    pub reason: Option<Arc<str>>,
    /// Priority or ceiling, if applicable.
    pub priority: Option<u8>,
    /// Requested bulk signal, if applicable.
    pub signal: Option<Signal>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            group: None,
            unit: None,
            unit_id: None,
            reason: None,
            priority: None,
            signal: None,
        }
    }

    /// Attaches a group name.
    #[inline]
    pub fn with_group(mut self, group: impl Into<Arc<str>>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Attaches a unit name.
    #[inline]
    pub fn with_unit(mut self, unit: impl Into<Arc<str>>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attaches a unit id.
    #[inline]
    pub fn with_unit_id(mut self, id: u64) -> Self {
        self.unit_id = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a priority.
    #[inline]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Attaches a bulk signal.
    #[inline]
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
