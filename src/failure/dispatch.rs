//! # Failure dispatch chain.
//!
//! ```text
//! dispatch(unit, failure)
//!   ├─ unit handler set? ──► handler.uncaught
//!   └─ group.uncaught(unit, failure)
//!        ├─ group handler set? ──► handler.uncaught
//!        ├─ parent? ──► parent group, same rules
//!        └─ root reached
//!             ├─ process default set? ──► default.uncaught
//!             ├─ Failure::Canceled ──► ignored
//!             └─ fallback: error log + FailureUnhandled event
//! ```

use crate::core::Context;
use crate::error::Failure;
use crate::events::{Event, EventKind};
use crate::group::Group;
use crate::unit::Unit;

use super::default::default_handler;

/// Routes a failure raised by `unit` to the first responsible handler.
///
/// Exactly one handler (or the fallback) sees each failure.
pub fn dispatch(unit: &Unit, failure: &Failure) {
    if let Some(handler) = unit.failure_handler() {
        handler.uncaught(unit, failure);
        return;
    }
    match unit.group() {
        Some(group) => group.uncaught(unit, failure),
        None => unhandled(unit.context(), None, unit, failure),
    }
}

impl Group {
    /// Group-level failure handling: the group's own handler if installed,
    /// otherwise the nearest ancestor's, otherwise the process default.
    pub fn uncaught(&self, unit: &Unit, failure: &Failure) {
        if let Some(handler) = self.failure_handler() {
            handler.uncaught(unit, failure);
            return;
        }
        let mut next = self.parent();
        while let Some(group) = next {
            if let Some(handler) = group.failure_handler() {
                handler.uncaught(unit, failure);
                return;
            }
            next = group.parent();
        }
        unhandled(self.context(), Some(self), unit, failure);
    }
}

fn unhandled(ctx: &Context, group: Option<&Group>, unit: &Unit, failure: &Failure) {
    if let Some(handler) = default_handler() {
        handler.uncaught(unit, failure);
        return;
    }
    if failure.is_cancellation() {
        return;
    }

    let name = unit.name();
    let reason = format!("failure in unit \"{name}\": {}", failure.as_message());
    tracing::error!(unit = %name, failure = %failure.as_message(), "uncaught failure");

    let mut ev = Event::new(EventKind::FailureUnhandled)
        .with_unit(name)
        .with_unit_id(unit.id().as_u64())
        .with_reason(reason);
    if let Some(group) = group {
        ev = ev.with_group(group.name_arc());
    }
    ctx.bus.publish(ev);
}
