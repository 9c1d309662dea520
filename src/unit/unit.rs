//! # Unit: handle to one supervised execution.
//!
//! [`Unit`] is a cheap, cloneable handle (`Arc` inside). Equality and hashing
//! follow the unit's [`UnitId`].
//!
//! ## Start protocol
//! ```text
//! start()
//!   ├─ start_lock (one start at a time per unit)
//!   ├─ state != New ─────────────────────────► Err(InvalidState)
//!   ├─ group.commit_member(self)?
//!   ├─ substrate.begin(self)
//!   │     ├─ Ok  ─► state = Runnable, publish UnitStarted
//!   │     └─ Err ─► group.start_failed(self), publish UnitStartFailed, Err(Substrate)
//!   └─ (the substrate later calls exit(outcome))
//!
//! exit(outcome)
//!   ├─ Err(failure) ─► failure::dispatch(self, failure)
//!   └─ state = Terminated, group.terminated(self), drop body/handler/group
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use parking_lot::{Mutex, RwLock};

use super::builder::UnitBuilder;
use super::state::{UnitId, UnitState};
use crate::core::Context;
use crate::error::{Failure, TreeError};
use crate::events::{Event, EventKind};
use crate::failure::{self, HandlerRef};
use crate::group::{Group, Signal};
use crate::tasks::TaskRef;

pub(crate) struct UnitInner {
    pub(super) id: UnitId,
    pub(super) ctx: Arc<Context>,
    pub(super) name: RwLock<Arc<str>>,
    pub(super) priority: AtomicU8,
    pub(super) daemon: AtomicBool,
    pub(super) status: AtomicU8,
    pub(super) start_lock: Mutex<()>,
    pub(super) group: Mutex<Option<Arc<Group>>>,
    pub(super) handler: RwLock<Option<HandlerRef>>,
    pub(super) body: Mutex<Option<TaskRef>>,
}

impl UnitInner {
    fn status(&self) -> UnitState {
        UnitState::from_u8(self.status.load(Ordering::Acquire))
    }
}

impl Drop for UnitInner {
    /// A unit dropped before it ever started gives back its unstarted slot.
    fn drop(&mut self) {
        if self.status() != UnitState::New {
            return;
        }
        if let Some(group) = self.group.get_mut().take() {
            group.release_unstarted();
        }
    }
}

/// Handle to one execution unit.
#[derive(Clone)]
pub struct Unit {
    inner: Arc<UnitInner>,
}

impl Unit {
    /// Starts building a unit under `group`.
    pub fn builder(group: &Arc<Group>) -> UnitBuilder<'_> {
        UnitBuilder::new(group)
    }

    pub(super) fn from_inner(inner: UnitInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    // ---------------------------
    // Attributes
    // ---------------------------

    /// Stable identity.
    pub fn id(&self) -> UnitId {
        self.inner.id
    }

    /// Current name.
    pub fn name(&self) -> Arc<str> {
        self.inner.name.read().clone()
    }

    /// Renames the unit.
    pub fn set_name(&self, name: impl Into<Arc<str>>) -> Result<(), TreeError> {
        self.check_access()?;
        *self.inner.name.write() = name.into();
        Ok(())
    }

    /// Current priority.
    pub fn priority(&self) -> u8 {
        self.inner.priority.load(Ordering::Acquire)
    }

    /// Sets the priority, clamped into the legal range and capped at the
    /// group's current ceiling.
    pub fn set_priority(&self, p: u8) -> Result<(), TreeError> {
        self.check_access()?;
        let mut p = self.inner.ctx.cfg.clamp_priority(p);
        if let Some(group) = self.group() {
            p = p.min(group.priority_ceiling());
        }
        self.inner.priority.store(p, Ordering::Release);
        Ok(())
    }

    /// Daemon flag.
    pub fn is_daemon(&self) -> bool {
        self.inner.daemon.load(Ordering::Acquire)
    }

    /// Changes the daemon flag; only legal before the unit starts.
    pub fn set_daemon(&self, on: bool) -> Result<(), TreeError> {
        self.check_access()?;
        if self.inner.status() != UnitState::New {
            return Err(TreeError::invalid("daemon flag can only change before start"));
        }
        self.inner.daemon.store(on, Ordering::Release);
        Ok(())
    }

    /// Owning group; `None` once the unit has terminated.
    pub fn group(&self) -> Option<Arc<Group>> {
        self.inner.group.lock().clone()
    }

    /// Unit-level failure handler, if installed.
    pub fn failure_handler(&self) -> Option<HandlerRef> {
        self.inner.handler.read().clone()
    }

    /// Installs (or with `None` removes) the unit-level failure handler.
    pub fn set_failure_handler(&self, handler: Option<HandlerRef>) -> Result<(), TreeError> {
        self.check_access()?;
        *self.inner.handler.write() = handler;
        Ok(())
    }

    /// Body executed by the substrate; `None` after termination.
    pub fn body(&self) -> Option<TaskRef> {
        self.inner.body.lock().clone()
    }

    /// Lifecycle state.
    pub fn state(&self) -> UnitState {
        match self.inner.status() {
            UnitState::Runnable => self.inner.ctx.substrate.current_state(self),
            other => other,
        }
    }

    /// Liveness as reported by the substrate.
    pub fn is_alive(&self) -> bool {
        self.inner.ctx.substrate.is_alive(self)
    }

    pub(crate) fn context(&self) -> &Arc<Context> {
        &self.inner.ctx
    }

    fn check_access(&self) -> Result<(), TreeError> {
        match self.group() {
            Some(group) => self.inner.ctx.check(&group),
            None => Ok(()),
        }
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .with_unit(self.name())
            .with_unit_id(self.id().as_u64())
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    /// Commits the unit to its group and asks the substrate to begin it.
    ///
    /// ### Errors
    /// - [`TreeError::InvalidState`] if already started or the group refuses the commit
    /// - [`TreeError::Substrate`] if the substrate could not begin the unit;
    ///   bookkeeping is rolled back and `start` may be retried
    pub fn start(&self) -> Result<(), TreeError> {
        let _serial = self.inner.start_lock.lock();
        if self.inner.status() != UnitState::New {
            return Err(TreeError::invalid("unit already started"));
        }
        let group = self
            .group()
            .ok_or(TreeError::invalid("unit has no group"))?;

        group.commit_member(self)?;
        // A concurrent exit won; its depart removes the committed member.
        if self.is_terminated() {
            return Err(TreeError::invalid("unit exited before it started"));
        }

        match self.inner.ctx.substrate.begin(self) {
            Ok(()) => {
                let _ = self.inner.status.compare_exchange(
                    UnitState::New.as_u8(),
                    UnitState::Runnable.as_u8(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                tracing::debug!(unit = %self.name(), group = %group.name(), "unit started");
                group.publish(self.event(EventKind::UnitStarted));
                Ok(())
            }
            Err(err) => {
                group.start_failed(self);
                tracing::warn!(unit = %self.name(), error = %err, "substrate refused to begin unit");
                group.publish(self.event(EventKind::UnitStartFailed).with_reason(err.as_message()));
                Err(err.into())
            }
        }
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.inner.status() == UnitState::Terminated
    }

    /// Called by the substrate when the unit's execution ends.
    ///
    /// A failure is dispatched through the handler chain first; afterwards the
    /// unit leaves its group. Later calls are no-ops.
    pub fn exit(&self, outcome: Result<(), Failure>) {
        let prev = UnitState::from_u8(
            self.inner
                .status
                .swap(UnitState::Terminated.as_u8(), Ordering::AcqRel),
        );
        if prev == UnitState::Terminated {
            return;
        }

        // Handler and group link are still in place until cleared below.
        if let Err(failure) = &outcome {
            failure::dispatch(self, failure);
        }

        let group = self.inner.group.lock().take();
        self.inner.body.lock().take();
        self.inner.handler.write().take();

        if let Some(group) = group {
            group.depart(self);
            tracing::debug!(unit = %self.name(), group = %group.name(), "unit terminated");
            group.publish(self.event(EventKind::UnitTerminated));
        }
        self.inner.ctx.terminations.notify_waiters();
    }

    /// Requests a cooperative interrupt of this unit.
    pub fn interrupt(&self) -> Result<(), TreeError> {
        self.signal(Signal::Interrupt)
    }

    /// Delivers a single control request to this unit.
    pub fn signal(&self, signal: Signal) -> Result<(), TreeError> {
        self.check_access()?;
        signal.apply(self.inner.ctx.substrate.as_ref(), self);
        Ok(())
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Unit {}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("priority", &self.priority())
            .field("state", &self.inner.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::{Failure, SubstrateError};
    use crate::events::EventKind;
    use crate::failure::HandlerRef;
    use crate::group::{Group, Signal};
    use crate::substrate::ScriptedSubstrate;
    use crate::unit::{Unit, UnitState};
    use crate::{Tree, TreeConfig};

    fn tree() -> (Arc<Tree>, Arc<ScriptedSubstrate>) {
        let substrate = Arc::new(ScriptedSubstrate::new());
        let tree = Tree::builder(TreeConfig::default())
            .with_substrate(substrate.clone())
            .build();
        (tree, substrate)
    }

    #[test]
    fn state_follows_the_lifecycle() {
        let (tree, substrate) = tree();
        let unit = Unit::builder(tree.root()).build().unwrap();
        assert_eq!(unit.state(), UnitState::New);
        assert!(!unit.is_alive());

        unit.start().unwrap();
        assert_eq!(unit.state(), UnitState::Runnable);
        assert!(unit.is_alive());

        substrate.set_state(&unit, UnitState::Blocked);
        assert_eq!(unit.state(), UnitState::Blocked);

        substrate.finish(&unit, Ok(()));
        assert_eq!(unit.state(), UnitState::Terminated);
        assert!(unit.group().is_none());
        assert!(unit.body().is_none());
    }

    #[test]
    fn second_start_is_rejected() {
        let (tree, _) = tree();
        let unit = Unit::builder(tree.root()).build().unwrap();
        unit.start().unwrap();
        assert!(unit.start().unwrap_err().is_invalid_state());
        assert_eq!(tree.root().member_count(), 1);
    }

    #[test]
    fn start_failure_reports_the_substrate_error() {
        let (tree, substrate) = tree();
        let unit = Unit::builder(tree.root()).build().unwrap();
        substrate.fail_next_begin(SubstrateError::new("out of workers"));

        let err = unit.start().unwrap_err();
        assert_eq!(err.as_label(), "tree_substrate_failed");
        assert!(err.as_message().contains("out of workers"));
        assert_eq!(unit.state(), UnitState::New);
    }

    #[test]
    fn daemon_flag_is_frozen_after_start() {
        let (tree, _) = tree();
        let unit = Unit::builder(tree.root()).build().unwrap();
        unit.set_daemon(true).unwrap();
        unit.start().unwrap();
        assert!(unit.set_daemon(false).unwrap_err().is_invalid_state());
        assert!(unit.is_daemon());
    }

    #[test]
    fn priority_is_capped_by_the_group_ceiling() {
        let (tree, _) = tree();
        let g = Group::create(tree.root(), "g").unwrap();
        g.set_priority_ceiling(6).unwrap();
        let unit = Unit::builder(&g).build().unwrap();

        unit.set_priority(9).unwrap();
        assert_eq!(unit.priority(), 6);
        unit.set_priority(0).unwrap();
        assert_eq!(unit.priority(), 1);
    }

    #[test]
    fn exit_is_idempotent() {
        let (tree, _) = tree();
        let unit = Unit::builder(tree.root()).build().unwrap();
        unit.start().unwrap();
        unit.exit(Err(Failure::Canceled));
        unit.exit(Ok(()));
        assert_eq!(tree.root().member_count(), 0);
        assert_eq!(tree.root().unstarted_count(), 0);
    }

    #[test]
    fn repeated_failing_exit_reaches_the_handler_once() {
        let (tree, _) = tree();
        let hits = Arc::new(AtomicUsize::new(0));
        let handler: HandlerRef = {
            let hits = Arc::clone(&hits);
            Arc::new(move |_: &Unit, _: &Failure| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        let unit = Unit::builder(tree.root())
            .name("T")
            .failure_handler(handler)
            .build()
            .unwrap();
        unit.start().unwrap();
        let mut rx = tree.subscribe();

        unit.exit(Err(Failure::error("first")));
        unit.exit(Err(Failure::error("second")));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        while let Ok(ev) = rx.try_recv() {
            let unhandled = ev.kind == EventKind::FailureUnhandled
                && ev.unit_id == Some(unit.id().as_u64());
            assert!(!unhandled, "second exit reached the fallback");
        }
    }

    #[test]
    fn exit_before_start_releases_the_reservation() {
        let (tree, _) = tree();
        let unit = Unit::builder(tree.root()).build().unwrap();
        unit.exit(Ok(()));
        assert_eq!(tree.root().unstarted_count(), 0);
        assert!(unit.start().unwrap_err().is_invalid_state());
    }

    #[test]
    fn single_unit_signal_goes_to_the_substrate() {
        let (tree, substrate) = tree();
        let unit = Unit::builder(tree.root()).build().unwrap();
        unit.start().unwrap();
        unit.interrupt().unwrap();
        unit.signal(Signal::Suspend).unwrap();
        assert_eq!(
            substrate.requests_for(&unit),
            vec![Signal::Interrupt, Signal::Suspend]
        );
    }

    #[test]
    fn rename_is_visible_through_every_clone() {
        let (tree, _) = tree();
        let unit = Unit::builder(tree.root()).name("before").build().unwrap();
        let other = unit.clone();
        unit.set_name("after").unwrap();
        assert_eq!(&*other.name(), "after");
        assert_eq!(unit, other);
    }
}
