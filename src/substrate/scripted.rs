//! # Deterministic substrate for tests and tooling.
//!
//! [`ScriptedSubstrate`] never runs anything. It records every control request,
//! answers liveness and state from a table the test controls, and lets the
//! test decide when (and how) each unit finishes.
//!
//! ```text
//! begin(unit)          ──► alive += unit    (or the next queued failure)
//! request_*(unit)      ──► requests.push((id, signal))
//! finish(unit, result) ──► alive -= unit, then unit.exit(result)
//! kill(unit)           ──► alive -= unit    (dead handle stays in its group)
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;

use super::Substrate;
use crate::error::{Failure, SubstrateError};
use crate::group::Signal;
use crate::unit::{Unit, UnitId, UnitState};

#[derive(Default)]
struct Script {
    alive: HashSet<UnitId>,
    states: HashMap<UnitId, UnitState>,
    begin_failures: VecDeque<SubstrateError>,
    requests: Vec<(UnitId, Signal)>,
    current: Option<Unit>,
}

/// Test-driven substrate; see the [module documentation](self).
#[derive(Default)]
pub struct ScriptedSubstrate {
    script: Mutex<Script>,
}

impl ScriptedSubstrate {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `begin` call fail with `err`. Calls queue up.
    pub fn fail_next_begin(&self, err: SubstrateError) {
        self.script.lock().begin_failures.push_back(err);
    }

    /// Overrides the state reported for a running unit.
    pub fn set_state(&self, unit: &Unit, state: UnitState) {
        self.script.lock().states.insert(unit.id(), state);
    }

    /// Sets the unit reported by [`Substrate::current`].
    ///
    /// The substrate keeps the handle alive until it is cleared with `None`.
    pub fn set_current(&self, unit: Option<Unit>) {
        self.script.lock().current = unit;
    }

    /// Ends `unit`'s execution with `outcome`.
    pub fn finish(&self, unit: &Unit, outcome: Result<(), Failure>) {
        self.forget(unit);
        unit.exit(outcome);
    }

    /// Marks `unit` dead without telling the tree, leaving a stale member.
    pub fn kill(&self, unit: &Unit) {
        self.forget(unit);
    }

    /// All recorded control requests, oldest first.
    pub fn requests(&self) -> Vec<(UnitId, Signal)> {
        self.script.lock().requests.clone()
    }

    /// Control requests recorded for `unit`, oldest first.
    pub fn requests_for(&self, unit: &Unit) -> Vec<Signal> {
        self.script
            .lock()
            .requests
            .iter()
            .filter(|(id, _)| *id == unit.id())
            .map(|(_, signal)| *signal)
            .collect()
    }

    fn forget(&self, unit: &Unit) {
        let mut script = self.script.lock();
        script.alive.remove(&unit.id());
        script.states.remove(&unit.id());
    }

    fn record(&self, unit: &Unit, signal: Signal) {
        let mut script = self.script.lock();
        if script.alive.contains(&unit.id()) {
            script.requests.push((unit.id(), signal));
        }
    }
}

impl Substrate for ScriptedSubstrate {
    fn begin(&self, unit: &Unit) -> Result<(), SubstrateError> {
        let mut script = self.script.lock();
        if let Some(err) = script.begin_failures.pop_front() {
            return Err(err);
        }
        if !script.alive.insert(unit.id()) {
            return Err(SubstrateError::new("unit is already running"));
        }
        Ok(())
    }

    fn request_interrupt(&self, unit: &Unit) {
        self.record(unit, Signal::Interrupt);
    }

    fn request_stop(&self, unit: &Unit) {
        self.record(unit, Signal::Stop);
    }

    fn request_suspend(&self, unit: &Unit) {
        self.record(unit, Signal::Suspend);
    }

    fn request_resume(&self, unit: &Unit) {
        self.record(unit, Signal::Resume);
    }

    fn is_alive(&self, unit: &Unit) -> bool {
        self.script.lock().alive.contains(&unit.id())
    }

    fn current_state(&self, unit: &Unit) -> UnitState {
        let script = self.script.lock();
        match script.states.get(&unit.id()) {
            Some(state) => *state,
            None if script.alive.contains(&unit.id()) => UnitState::Runnable,
            None => UnitState::Terminated,
        }
    }

    fn current(&self) -> Option<Unit> {
        self.script.lock().current.clone()
    }
}
