use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static UNIT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a unit, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(u64);

impl UnitId {
    pub(crate) fn next() -> Self {
        Self(UNIT_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Observable lifecycle state of a unit.
///
/// `New` and `Terminated` come from the tree's own bookkeeping; the states in
/// between are reported by the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitState {
    /// Built, not yet started.
    New,
    /// Executing (or ready to).
    Runnable,
    /// Blocked on a lock or resource.
    Blocked,
    /// Waiting without a deadline (including suspended).
    Waiting,
    /// Waiting with a deadline.
    TimedWaiting,
    /// Finished; will never run again.
    Terminated,
}

impl UnitState {
    /// Short stable label (snake_case).
    pub fn as_label(&self) -> &'static str {
        match self {
            UnitState::New => "new",
            UnitState::Runnable => "runnable",
            UnitState::Blocked => "blocked",
            UnitState::Waiting => "waiting",
            UnitState::TimedWaiting => "timed_waiting",
            UnitState::Terminated => "terminated",
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => UnitState::New,
            1 => UnitState::Runnable,
            2 => UnitState::Blocked,
            3 => UnitState::Waiting,
            4 => UnitState::TimedWaiting,
            _ => UnitState::Terminated,
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
