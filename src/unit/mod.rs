//! # Execution units.
//!
//! - [`Unit`] handle and its start/exit protocol
//! - [`UnitBuilder`] with attribute inheritance
//! - [`UnitId`] / [`UnitState`]

mod builder;
mod state;
#[allow(clippy::module_inception)]
mod unit;

pub use builder::UnitBuilder;
pub use state::{UnitId, UnitState};
pub use unit::Unit;
