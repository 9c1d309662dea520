//! # Execution substrate.
//!
//! The tree never executes units itself. A [`Substrate`] begins them, carries
//! control requests to them and reports their liveness and state. Every
//! finished execution must end with exactly one [`Unit::exit`] call.
//!
//! Two implementations are provided:
//! - [`TokioSubstrate`]: runs each unit body as a tokio task
//! - [`ScriptedSubstrate`]: deterministic, test-driven, records every request
//!
//! ## Rules
//! - Methods are synchronous and may be called while a group's lock is held;
//!   they must not call back into the tree.
//! - [`Unit::exit`] is called by the execution itself once it finishes.
//! - `request_*` on a unit that is not running is a no-op.

mod runtime;
mod scripted;

pub use runtime::TokioSubstrate;
pub use scripted::ScriptedSubstrate;

use crate::error::SubstrateError;
use crate::unit::{Unit, UnitState};

/// Executes units and carries control requests to them.
pub trait Substrate: Send + Sync + 'static {
    /// Starts executing `unit`.
    ///
    /// ### Errors
    /// [`SubstrateError`] if the unit cannot be started (for example, no
    /// runtime or no capacity); the tree then rolls back its bookkeeping.
    fn begin(&self, unit: &Unit) -> Result<(), SubstrateError>;

    /// Cooperative interrupt request.
    fn request_interrupt(&self, unit: &Unit);

    /// Forced stop request.
    fn request_stop(&self, unit: &Unit);

    /// Pause request.
    fn request_suspend(&self, unit: &Unit);

    /// Undo a pause request.
    fn request_resume(&self, unit: &Unit);

    /// True while the unit's execution has begun and not yet finished.
    fn is_alive(&self, unit: &Unit) -> bool;

    /// Execution state of a started unit.
    fn current_state(&self, unit: &Unit) -> UnitState;

    /// The unit whose execution is calling, if any.
    fn current(&self) -> Option<Unit> {
        None
    }
}
