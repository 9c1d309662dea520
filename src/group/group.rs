//! # Group: one node of the supervision tree.
//!
//! A [`Group`] owns its member units and its child groups and keeps a
//! non-owning back-reference to its parent. It is always shared as `Arc<Group>`.
//!
//! ## Lifecycle protocol
//! ```text
//! Unit::builder(..).build() ──► reserve_unstarted()        unstarted += 1
//! Unit::start()             ──► commit_member(unit)        unstarted -= 1, members += unit
//!        substrate.begin ✗  ──► start_failed(unit)         members -= unit, unstarted += 1
//! Unit::exit()              ──► terminated(unit)           members -= unit
//!                                  └─ daemon && empty ──► destroyed, parent.remove_child(self)
//!                                                            └─ parent daemon && empty ──► ... (cascade)
//! ```
//!
//! ## Rules
//! - Every operation takes **only this node's lock**; the daemon cascade walks
//!   upwards one node at a time, releasing each lock before touching the parent.
//! - Values read across nodes without locking (ceiling, daemon flag) live in atomics.
//! - A destroyed group has no members, no unstarted units and no children.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::core::Context;
use crate::error::TreeError;
use crate::events::{Event, EventKind};
use crate::failure::HandlerRef;
use crate::unit::Unit;

/// Mutable part of a group, guarded by the group's own lock.
pub(crate) struct GroupState {
    pub(crate) destroyed: bool,
    pub(crate) unstarted: usize,
    pub(crate) members: Vec<Unit>,
    pub(crate) children: Vec<Arc<Group>>,
}

impl GroupState {
    fn with_capacity(cap: usize) -> Self {
        Self {
            destroyed: false,
            unstarted: 0,
            members: Vec::with_capacity(cap),
            children: Vec::with_capacity(cap),
        }
    }

    fn is_empty(&self) -> bool {
        self.members.is_empty() && self.unstarted == 0 && self.children.is_empty()
    }

    fn take_member(&mut self, unit: &Unit) -> Option<Unit> {
        let idx = self.members.iter().position(|m| m == unit)?;
        Some(self.members.swap_remove(idx))
    }
}

/// A node of the supervision tree.
///
/// See the [module documentation](self) for the lifecycle protocol.
pub struct Group {
    name: Arc<str>,
    parent: Option<Weak<Group>>,
    ctx: Arc<Context>,
    pub(super) ceiling: AtomicU8,
    daemon: AtomicBool,
    handler: RwLock<Option<HandlerRef>>,
    pub(super) state: Mutex<GroupState>,
}

impl Group {
    /// Creates the root group of a tree.
    pub(crate) fn root(ctx: Arc<Context>) -> Arc<Group> {
        let cap = ctx.cfg.initial_capacity;
        let root = Arc::new(Group {
            name: Arc::from(ctx.cfg.root_name.as_str()),
            parent: None,
            ceiling: AtomicU8::new(ctx.cfg.max_priority),
            daemon: AtomicBool::new(false),
            handler: RwLock::new(None),
            state: Mutex::new(GroupState::with_capacity(cap)),
            ctx,
        });
        root.publish(Event::new(EventKind::GroupCreated).with_priority(root.priority_ceiling()));
        root
    }

    /// Creates a group named `name` under `parent`.
    ///
    /// The new group inherits the parent's daemon flag and priority ceiling.
    ///
    /// ### Errors
    /// - [`TreeError::AccessDenied`] if the access-control collaborator rejects `parent`
    /// - [`TreeError::InvalidState`] if `parent` is destroyed
    pub fn create(parent: &Arc<Group>, name: impl Into<Arc<str>>) -> Result<Arc<Group>, TreeError> {
        parent.ctx.check(parent)?;

        let group = Arc::new(Group {
            name: name.into(),
            parent: Some(Arc::downgrade(parent)),
            ctx: Arc::clone(&parent.ctx),
            ceiling: AtomicU8::new(parent.priority_ceiling()),
            daemon: AtomicBool::new(parent.is_daemon()),
            handler: RwLock::new(None),
            state: Mutex::new(GroupState::with_capacity(parent.ctx.cfg.initial_capacity)),
        });
        parent.add_child(&group)?;

        tracing::debug!(group = %group.name, parent = %parent.name, "group created");
        group.publish(Event::new(EventKind::GroupCreated).with_priority(group.priority_ceiling()));
        Ok(group)
    }

    /// Registers `child`, copying the inherited attributes under this node's lock
    /// so that a concurrent ceiling cascade either sees the child or is seen by it.
    fn add_child(&self, child: &Arc<Group>) -> Result<(), TreeError> {
        let mut st = self.state.lock();
        if st.destroyed {
            return Err(TreeError::invalid("parent group is destroyed"));
        }
        child
            .ceiling
            .store(self.priority_ceiling(), Ordering::Release);
        child.daemon.store(self.is_daemon(), Ordering::Release);
        st.children.push(Arc::clone(child));
        Ok(())
    }

    // ---------------------------
    // Attributes
    // ---------------------------

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Parent group, `None` for the root (or once the parent is gone).
    pub fn parent(&self) -> Option<Arc<Group>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// True for the root group of the tree.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// True if this group is `other` or one of its ancestors.
    pub fn is_ancestor_of(&self, other: &Group) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let mut next = other.parent();
        while let Some(group) = next {
            if std::ptr::eq(self, Arc::as_ptr(&group)) {
                return true;
            }
            next = group.parent();
        }
        false
    }

    /// Current priority ceiling.
    pub fn priority_ceiling(&self) -> u8 {
        self.ceiling.load(Ordering::Acquire)
    }

    /// Daemon groups destroy themselves once empty.
    pub fn is_daemon(&self) -> bool {
        self.daemon.load(Ordering::Acquire)
    }

    /// Changes the daemon flag.
    ///
    /// Turning the flag on does not destroy an already empty group; the next
    /// membership change does.
    pub fn set_daemon(&self, on: bool) -> Result<(), TreeError> {
        self.ctx.check(self)?;
        self.daemon.store(on, Ordering::Release);
        self.publish(Event::new(EventKind::DaemonChanged).with_reason(if on { "on" } else { "off" }));
        Ok(())
    }

    /// True once the group has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Number of committed members (dead handles included).
    pub fn member_count(&self) -> usize {
        self.state.lock().members.len()
    }

    /// Number of units reserved but not (successfully) started.
    pub fn unstarted_count(&self) -> usize {
        self.state.lock().unstarted
    }

    /// Number of direct child groups.
    pub fn child_count(&self) -> usize {
        self.state.lock().children.len()
    }

    /// Installs a group-level failure handler, replacing the default forwarding
    /// at this level. `None` restores the default.
    pub fn set_failure_handler(&self, handler: Option<HandlerRef>) -> Result<(), TreeError> {
        self.ctx.check(self)?;
        *self.handler.write() = handler;
        Ok(())
    }

    /// Group-level failure handler, if installed.
    pub fn failure_handler(&self) -> Option<HandlerRef> {
        self.handler.read().clone()
    }

    pub(crate) fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    pub(crate) fn publish(&self, ev: Event) {
        self.ctx.bus.publish(ev.with_group(self.name_arc()));
    }

    // ---------------------------
    // Lifecycle protocol
    // ---------------------------

    /// Reserves an unstarted slot for a unit being constructed under this group.
    ///
    /// ### Errors
    /// [`TreeError::InvalidState`] if the group is destroyed.
    pub fn reserve_unstarted(&self) -> Result<(), TreeError> {
        let mut st = self.state.lock();
        if st.destroyed {
            return Err(TreeError::invalid("group is destroyed"));
        }
        st.unstarted += 1;
        Ok(())
    }

    /// Moves `unit` from the unstarted reservation into the member collection.
    ///
    /// ### Errors
    /// [`TreeError::InvalidState`] if the group is destroyed, `unit` has already
    /// exited or is already a member, or there is no unstarted reservation to
    /// consume.
    pub fn commit_member(&self, unit: &Unit) -> Result<(), TreeError> {
        let mut st = self.state.lock();
        if st.destroyed {
            return Err(TreeError::invalid("group is destroyed"));
        }
        // Checked under the lock: an exit either lands before this and its
        // depart has already released the reservation, or after the push and
        // its depart removes the member.
        if unit.is_terminated() {
            return Err(TreeError::invalid("unit has already exited"));
        }
        if st.members.iter().any(|m| m == unit) {
            return Err(TreeError::invalid("unit is already a member"));
        }
        if st.unstarted == 0 {
            return Err(TreeError::invalid("no unstarted reservation to commit"));
        }
        st.members.push(unit.clone());
        st.unstarted -= 1;
        Ok(())
    }

    /// Rolls back [`commit_member`](Self::commit_member) after the substrate
    /// failed to begin `unit`.
    pub fn start_failed(&self, unit: &Unit) {
        let removed = {
            let mut st = self.state.lock();
            let removed = st.take_member(unit);
            st.unstarted += 1;
            removed
        };
        drop(removed);
    }

    /// Removes a terminated `unit`; an emptied daemon group destroys itself and
    /// notifies its parent.
    pub fn terminated(&self, unit: &Unit) {
        self.settle(|st| st.take_member(unit));
    }

    /// Exit path of a unit: a member leaves the collection, a unit that never
    /// committed gives back its reservation.
    pub(crate) fn depart(&self, unit: &Unit) {
        self.settle(|st| match st.take_member(unit) {
            Some(removed) => Some(removed),
            None => {
                st.unstarted = st.unstarted.saturating_sub(1);
                None
            }
        });
    }

    /// Releases the reservation of a unit that will never be started.
    pub(crate) fn release_unstarted(&self) {
        self.settle(|st| {
            st.unstarted = st.unstarted.saturating_sub(1);
            None
        });
    }

    /// Applies a shrinking change under the lock, then runs the daemon cascade
    /// with the lock released. Removed units are dropped outside the lock.
    fn settle(&self, change: impl FnOnce(&mut GroupState) -> Option<Unit>) {
        let (removed, destroyed) = {
            let mut st = self.state.lock();
            let removed = change(&mut st);
            (removed, self.try_auto_destroy(&mut st))
        };
        drop(removed);
        if destroyed {
            self.detach_from_parent();
        }
    }

    /// Explicitly destroys an empty group and detaches it from its parent.
    ///
    /// ### Errors
    /// - [`TreeError::AccessDenied`] if the access-control collaborator rejects the group
    /// - [`TreeError::InvalidState`] if the group is the root, already destroyed,
    ///   or still has members, unstarted units or child groups
    pub fn destroy(&self) -> Result<(), TreeError> {
        self.ctx.check(self)?;
        if self.is_root() {
            return Err(TreeError::invalid("root group cannot be destroyed"));
        }
        {
            let mut st = self.state.lock();
            if st.destroyed {
                return Err(TreeError::invalid("group already destroyed"));
            }
            if !st.is_empty() {
                return Err(TreeError::invalid("group is not empty"));
            }
            st.destroyed = true;
        }

        tracing::debug!(group = %self.name, "group destroyed");
        self.publish(Event::new(EventKind::GroupDestroyed).with_reason("explicit"));
        self.detach_from_parent();
        Ok(())
    }

    /// Marks the group destroyed if it is a non-root daemon group that just became empty.
    ///
    /// Must be called with `st` borrowed from this group's own lock.
    fn try_auto_destroy(&self, st: &mut GroupState) -> bool {
        if self.is_root() || st.destroyed || !self.is_daemon() || !st.is_empty() {
            return false;
        }
        st.destroyed = true;
        tracing::debug!(group = %self.name, "daemon group emptied, destroyed");
        self.publish(Event::new(EventKind::GroupDestroyed).with_reason("daemon_empty"));
        true
    }

    /// Removes this (destroyed) group from its parent and continues the daemon
    /// cascade upwards while ancestors empty out.
    fn detach_from_parent(&self) {
        let Some(mut parent) = self.parent() else {
            return;
        };
        let mut cascade = parent.remove_child(self);
        while cascade {
            let Some(grand) = parent.parent() else {
                break;
            };
            cascade = grand.remove_child(&parent);
            parent = grand;
        }
    }

    /// Removes `child`; returns true if this group auto-destroyed as a result.
    fn remove_child(&self, child: &Group) -> bool {
        let (removed, destroyed) = {
            let mut st = self.state.lock();
            let removed = st
                .children
                .iter()
                .position(|c| std::ptr::eq(Arc::as_ptr(c), child))
                .map(|idx| st.children.swap_remove(idx));
            (removed, self.try_auto_destroy(&mut st))
        };
        drop(removed);
        destroyed
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("ceiling", &self.priority_ceiling())
            .field("daemon", &self.is_daemon())
            .finish_non_exhaustive()
    }
}
