use std::sync::Arc;

use crate::error::Failure;
use crate::unit::Unit;

/// Receives failures that escaped a unit's body.
///
/// Implemented for any `Fn(&Unit, &Failure)` closure.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use groupvisor::{Failure, HandlerRef, Unit};
///
/// let handler: HandlerRef = Arc::new(|unit: &Unit, failure: &Failure| {
///     eprintln!("{} failed: {}", unit.name(), failure.as_message());
/// });
/// # let _ = handler;
/// ```
pub trait FailureHandler: Send + Sync + 'static {
    /// Handles `failure` raised by `unit`.
    fn uncaught(&self, unit: &Unit, failure: &Failure);
}

impl<F> FailureHandler for F
where
    F: Fn(&Unit, &Failure) + Send + Sync + 'static,
{
    fn uncaught(&self, unit: &Unit, failure: &Failure) {
        self(unit, failure)
    }
}

/// Shared handle to a failure handler.
pub type HandlerRef = Arc<dyn FailureHandler>;
