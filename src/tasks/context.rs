//! # Per-execution context handed to a unit body.
//!
//! The body observes control requests cooperatively:
//! - interrupt → [`UnitContext::is_interrupted`] / [`UnitContext::interrupted`]
//! - suspend / resume → [`UnitContext::checkpoint`] parks while suspended
//!
//! Forced stop needs no cooperation: the substrate drops the body future.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::unit::Unit;

/// Handle given to each execution of a unit body.
#[derive(Clone)]
pub struct UnitContext {
    unit: Unit,
    interrupt: CancellationToken,
    suspended: watch::Receiver<bool>,
}

impl UnitContext {
    pub(crate) fn new(unit: Unit, interrupt: CancellationToken, suspended: watch::Receiver<bool>) -> Self {
        Self {
            unit,
            interrupt,
            suspended,
        }
    }

    /// The unit being executed.
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// True once an interrupt has been requested.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_cancelled()
    }

    /// Completes when an interrupt is requested.
    pub async fn interrupted(&self) {
        self.interrupt.cancelled().await
    }

    /// Interrupt token, for handing to code that speaks `CancellationToken`.
    pub fn token(&self) -> &CancellationToken {
        &self.interrupt
    }

    /// True while a suspend request is in effect.
    pub fn is_suspended(&self) -> bool {
        *self.suspended.borrow()
    }

    /// Parks while the unit is suspended.
    ///
    /// Returns immediately when not suspended, and early on interrupt.
    pub async fn checkpoint(&self) {
        let mut suspended = self.suspended.clone();
        tokio::select! {
            _ = async { suspended.wait_for(|s| !*s).await.is_ok() } => {}
            _ = self.interrupt.cancelled() => {}
        }
    }
}
