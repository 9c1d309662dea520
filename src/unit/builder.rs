//! # Unit builder.
//!
//! Attributes not set explicitly are inherited:
//! - `daemon`: from the calling unit (per the substrate), else `false`
//! - `priority`: from the calling unit, else the configured normal priority;
//!   always clamped and capped at the group's ceiling
//! - `name`: `unit-<id>`
//!
//! [`UnitBuilder::build`] reserves an unstarted slot in the group; the slot is
//! consumed by [`Unit::start`] or given back when the unit is dropped unstarted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8};

use parking_lot::{Mutex, RwLock};

use super::state::{UnitId, UnitState};
use super::unit::{Unit, UnitInner};
use crate::error::TreeError;
use crate::events::{Event, EventKind};
use crate::failure::HandlerRef;
use crate::group::Group;
use crate::tasks::TaskRef;

/// Builder for [`Unit`].
#[must_use]
pub struct UnitBuilder<'g> {
    group: &'g Arc<Group>,
    name: Option<Arc<str>>,
    daemon: Option<bool>,
    priority: Option<u8>,
    handler: Option<HandlerRef>,
    body: Option<TaskRef>,
}

impl<'g> UnitBuilder<'g> {
    pub(super) fn new(group: &'g Arc<Group>) -> Self {
        Self {
            group,
            name: None,
            daemon: None,
            priority: None,
            handler: None,
            body: None,
        }
    }

    /// Sets the unit name.
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the daemon flag instead of inheriting it.
    pub fn daemon(mut self, on: bool) -> Self {
        self.daemon = Some(on);
        self
    }

    /// Sets the priority instead of inheriting it.
    pub fn priority(mut self, p: u8) -> Self {
        self.priority = Some(p);
        self
    }

    /// Installs a unit-level failure handler.
    pub fn failure_handler(mut self, handler: HandlerRef) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Sets the body the substrate executes.
    pub fn body(mut self, body: TaskRef) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds the unit and reserves its unstarted slot.
    ///
    /// ### Errors
    /// - [`TreeError::AccessDenied`] if the group is rejected
    /// - [`TreeError::InvalidState`] if the group is destroyed
    pub fn build(self) -> Result<Unit, TreeError> {
        let group = self.group;
        let ctx = Arc::clone(group.context());
        ctx.check(group)?;

        let caller = ctx.substrate.current();
        let daemon = self
            .daemon
            .or_else(|| caller.as_ref().map(Unit::is_daemon))
            .unwrap_or(false);
        let base = self
            .priority
            .or_else(|| caller.as_ref().map(Unit::priority))
            .unwrap_or_else(|| ctx.cfg.default_priority());
        let priority = ctx.cfg.clamp_priority(base).min(group.priority_ceiling());

        group.reserve_unstarted()?;

        let id = UnitId::next();
        let name = self
            .name
            .unwrap_or_else(|| Arc::from(format!("unit-{id}")));

        let unit = Unit::from_inner(UnitInner {
            id,
            ctx,
            name: RwLock::new(name),
            priority: AtomicU8::new(priority),
            daemon: AtomicBool::new(daemon),
            status: AtomicU8::new(UnitState::New.as_u8()),
            start_lock: Mutex::new(()),
            group: Mutex::new(Some(Arc::clone(group))),
            handler: RwLock::new(self.handler),
            body: Mutex::new(self.body),
        });

        group.publish(
            Event::new(EventKind::UnitCreated)
                .with_unit(unit.name())
                .with_unit_id(id.as_u64())
                .with_priority(priority),
        );
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::group::Group;
    use crate::substrate::ScriptedSubstrate;
    use crate::unit::Unit;
    use crate::{Tree, TreeConfig};

    fn tree() -> (Arc<Tree>, Arc<ScriptedSubstrate>) {
        let substrate = Arc::new(ScriptedSubstrate::new());
        let tree = Tree::builder(TreeConfig::default())
            .with_substrate(substrate.clone())
            .build();
        (tree, substrate)
    }

    #[test]
    fn defaults_outside_any_unit() {
        let (tree, _) = tree();
        let unit = Unit::builder(tree.root()).build().unwrap();
        assert!(!unit.is_daemon());
        assert_eq!(unit.priority(), 5);
        assert_eq!(&*unit.name(), format!("unit-{}", unit.id()));
        assert_eq!(tree.root().unstarted_count(), 1);
    }

    #[test]
    fn inherits_from_the_calling_unit() {
        let (tree, substrate) = tree();
        let parent = Unit::builder(tree.root())
            .daemon(true)
            .priority(8)
            .build()
            .unwrap();
        substrate.set_current(Some(parent.clone()));

        let child = Unit::builder(tree.root()).build().unwrap();
        assert!(child.is_daemon());
        assert_eq!(child.priority(), 8);

        let g = Group::create(tree.root(), "low").unwrap();
        g.set_priority_ceiling(3).unwrap();
        let capped = Unit::builder(&g).build().unwrap();
        assert_eq!(capped.priority(), 3);

        substrate.set_current(None);
    }
}
