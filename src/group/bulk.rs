//! Subtree-wide operations: ceiling cascade, bulk signals, counting,
//! enumeration and listing. All of them traverse through [`walk`].

use std::convert::Infallible;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::group::Group;
use super::signal::Signal;
use super::snapshot::{Level, walk};
use crate::error::TreeError;
use crate::events::{Event, EventKind};
use crate::unit::Unit;

impl Group {
    /// Lowers (or raises, up to the parent's ceiling) the priority ceiling of
    /// this group and of every descendant.
    ///
    /// `p` is first clamped into the configured priority range; each node then
    /// takes `min(p, parent's ceiling)`. Member priorities are not changed.
    ///
    /// ### Errors
    /// [`TreeError::AccessDenied`] if any visited group is rejected. Groups
    /// visited before the rejection keep their new ceiling.
    pub fn set_priority_ceiling(self: &Arc<Self>, p: u8) -> Result<(), TreeError> {
        let p = self.context().cfg.clamp_priority(p);

        walk(
            self,
            true,
            |g| g.context().check(g),
            |Level { group, .. }| {
                let ceiling = match group.parent() {
                    Some(parent) => p.min(parent.priority_ceiling()),
                    None => p,
                };
                group.ceiling.store(ceiling, Ordering::Release);
                group.publish(Event::new(EventKind::CeilingChanged).with_priority(ceiling));
            },
        )
    }

    /// Delivers `signal` to every member of this subtree.
    ///
    /// For [`Signal::Stop`] and [`Signal::Suspend`] the calling unit (as
    /// reported by the substrate) is skipped; the returned flag tells whether
    /// it was found inside the subtree. For other signals the flag is always false.
    ///
    /// ### Errors
    /// [`TreeError::AccessDenied`] if any visited group is rejected.
    pub fn signal_all(self: &Arc<Self>, signal: Signal) -> Result<bool, TreeError> {
        let ctx = self.context();
        let caller = if signal.skips_caller() {
            ctx.substrate.current()
        } else {
            None
        };
        let mut caller_inside = false;

        self.publish(Event::new(EventKind::SignalRequested).with_signal(signal));
        walk(
            self,
            true,
            |g| g.context().check(g),
            |Level { state, .. }| {
                for unit in &state.members {
                    if caller.as_ref() == Some(unit) {
                        caller_inside = true;
                        continue;
                    }
                    signal.apply(ctx.substrate.as_ref(), unit);
                }
            },
        )?;
        Ok(caller_inside)
    }

    /// Requests a cooperative interrupt of every unit in this subtree.
    pub fn interrupt(self: &Arc<Self>) -> Result<(), TreeError> {
        self.signal_all(Signal::Interrupt).map(drop)
    }

    /// Forcibly stops every unit in this subtree, the calling unit last.
    pub fn stop(self: &Arc<Self>) -> Result<(), TreeError> {
        self.signal_all_then_caller(Signal::Stop)
    }

    /// Suspends every unit in this subtree, the calling unit last.
    pub fn suspend(self: &Arc<Self>) -> Result<(), TreeError> {
        self.signal_all_then_caller(Signal::Suspend)
    }

    /// Resumes every suspended unit in this subtree.
    pub fn resume(self: &Arc<Self>) -> Result<(), TreeError> {
        self.signal_all(Signal::Resume).map(drop)
    }

    fn signal_all_then_caller(self: &Arc<Self>, signal: Signal) -> Result<(), TreeError> {
        if self.signal_all(signal)? {
            let substrate = &self.context().substrate;
            if let Some(me) = substrate.current() {
                signal.apply(substrate.as_ref(), &me);
            }
        }
        Ok(())
    }

    /// Number of live members of this group (and its descendants if `recursive`).
    ///
    /// The result is a best-effort estimate under concurrent change.
    pub fn count_members(self: &Arc<Self>, recursive: bool) -> usize {
        let substrate = &self.context().substrate;
        let mut n = 0;
        let Ok(()) = walk::<Infallible>(self, recursive, |_| Ok(()), |Level { state, .. }| {
            n += state.members.iter().filter(|u| substrate.is_alive(u)).count();
        });
        n
    }

    /// Appends live members of this group (and its descendants if `recursive`)
    /// to `into`; returns how many were appended.
    ///
    /// ### Errors
    /// [`TreeError::AccessDenied`] if this group is rejected.
    pub fn enumerate(self: &Arc<Self>, into: &mut Vec<Unit>, recursive: bool) -> Result<usize, TreeError> {
        self.context().check(self)?;
        let substrate = &self.context().substrate;
        let before = into.len();
        let Ok(()) = walk::<Infallible>(self, recursive, |_| Ok(()), |Level { state, .. }| {
            into.extend(state.members.iter().filter(|u| substrate.is_alive(u)).cloned());
        });
        Ok(into.len() - before)
    }

    /// Number of descendant groups (direct children only unless `recursive`).
    pub fn count_groups(self: &Arc<Self>, recursive: bool) -> usize {
        let mut n = 0;
        let Ok(()) = walk::<Infallible>(self, recursive, |_| Ok(()), |Level { state, .. }| {
            n += state.children.len();
        });
        n
    }

    /// Appends descendant groups to `into` in depth-first pre-order; returns how
    /// many were appended.
    ///
    /// ### Errors
    /// [`TreeError::AccessDenied`] if this group is rejected.
    pub fn enumerate_groups(
        self: &Arc<Self>,
        into: &mut Vec<Arc<Group>>,
        recursive: bool,
    ) -> Result<usize, TreeError> {
        self.context().check(self)?;
        let before = into.len();
        let Ok(()) = walk::<Infallible>(self, recursive, |_| Ok(()), |Level { group, .. }| {
            if !Arc::ptr_eq(group, self) {
                into.push(Arc::clone(group));
            }
        });
        Ok(into.len() - before)
    }

    /// Human-readable dump of this subtree, one line per group and unit.
    ///
    /// ```text
    /// Group[name=system, ceiling=10, daemon=false]
    ///     Unit[name=worker-1, id=3, priority=5, state=runnable]
    ///     Group[name=workers, ceiling=7, daemon=true]
    /// ```
    pub fn list_tree(self: &Arc<Self>) -> String {
        let mut out = String::new();
        let Ok(()) = walk::<Infallible>(self, true, |_| Ok(()), |Level { group, state, depth }| {
            let pad = "    ".repeat(depth);
            let _ = writeln!(
                out,
                "{pad}Group[name={}, ceiling={}, daemon={}]",
                group.name(),
                group.priority_ceiling(),
                group.is_daemon()
            );
            for unit in &state.members {
                let _ = writeln!(
                    out,
                    "{pad}    Unit[name={}, id={}, priority={}, state={}]",
                    unit.name(),
                    unit.id(),
                    unit.priority(),
                    unit.state()
                );
            }
        });
        out
    }

    /// Members of this subtree as recorded by bookkeeping, dead handles included.
    pub(crate) fn subtree_members(self: &Arc<Self>) -> Vec<Unit> {
        let mut out = Vec::new();
        let Ok(()) = walk::<Infallible>(self, true, |_| Ok(()), |Level { state, .. }| {
            out.extend(state.members.iter().cloned());
        });
        out
    }
}
