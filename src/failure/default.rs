//! Process-wide default failure handler.
//!
//! One swappable slot shared by every tree in the process. It is not scoped or
//! stacked: the last writer wins, and readers see either no handler or a fully
//! constructed one.

use parking_lot::RwLock;

use super::handler::HandlerRef;

static DEFAULT_HANDLER: RwLock<Option<HandlerRef>> = parking_lot::const_rwlock(None);

/// Installs (or with `None` clears) the process-wide default handler.
///
/// Returns the previously installed handler.
pub fn set_default_handler(handler: Option<HandlerRef>) -> Option<HandlerRef> {
    std::mem::replace(&mut *DEFAULT_HANDLER.write(), handler)
}

/// Currently installed process-wide default handler.
pub fn default_handler() -> Option<HandlerRef> {
    DEFAULT_HANDLER.read().clone()
}
