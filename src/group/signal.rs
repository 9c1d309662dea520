use crate::substrate::Substrate;
use crate::unit::Unit;

/// Bulk control request applied to every member of a subtree.
///
/// `Stop`, `Suspend` and `Resume` are legacy operations kept for parity with
/// older callers; prefer cooperative [`Interrupt`](Signal::Interrupt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Cooperative interrupt request.
    Interrupt,
    /// Forced stop.
    Stop,
    /// Pause execution at the next checkpoint.
    Suspend,
    /// Undo a previous suspend.
    Resume,
}

impl Signal {
    /// Short stable label (snake_case).
    pub fn as_label(&self) -> &'static str {
        match self {
            Signal::Interrupt => "interrupt",
            Signal::Stop => "stop",
            Signal::Suspend => "suspend",
            Signal::Resume => "resume",
        }
    }

    /// Stop and suspend must not be delivered to the calling unit mid-traversal.
    pub(crate) fn skips_caller(self) -> bool {
        matches!(self, Signal::Stop | Signal::Suspend)
    }

    pub(crate) fn apply(self, substrate: &dyn Substrate, unit: &Unit) {
        match self {
            Signal::Interrupt => substrate.request_interrupt(unit),
            Signal::Stop => substrate.request_stop(unit),
            Signal::Suspend => substrate.request_suspend(unit),
            Signal::Resume => substrate.request_resume(unit),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}
