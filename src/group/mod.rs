//! # Groups: the nodes of the supervision tree.
//!
//! - [`Group`] node with its own lock, lifecycle bookkeeping and daemon cascade
//! - bulk operations over a subtree (ceiling, signals, counts, listing)
//! - [`Signal`] bulk control requests
//!
//! All subtree traversal is snapshot based: a node's lock is held only while
//! its own state is read and its children are copied.

mod bulk;
#[allow(clippy::module_inception)]
mod group;
mod signal;
mod snapshot;

pub use group::Group;
pub use signal::Signal;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::{AccessDenied, SubstrateError, TreeError};
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
    fn child_inherits_ceiling_and_daemon() {
        let (tree, _) = tree();
        let a = Group::create(tree.root(), "A").unwrap();
        a.set_priority_ceiling(7).unwrap();
        a.set_daemon(true).unwrap();

        let b = Group::create(&a, "B").unwrap();
        assert_eq!(b.priority_ceiling(), 7);
        assert!(b.is_daemon());
        assert!(Arc::ptr_eq(&b.parent().unwrap(), &a));
        assert_eq!(a.child_count(), 1);
    }

    #[test]
    fn ancestry_includes_self() {
        let (tree, _) = tree();
        let a = Group::create(tree.root(), "A").unwrap();
        let b = Group::create(&a, "B").unwrap();
        assert!(a.is_ancestor_of(&a));
        assert!(a.is_ancestor_of(&b));
        assert!(tree.root().is_ancestor_of(&b));
        assert!(!b.is_ancestor_of(&a));
    }

    #[test]
    fn daemon_group_destroys_itself_when_last_unit_terminates() {
        let (tree, substrate) = tree();
        let root = tree.root();
        let c = Group::create(root, "C").unwrap();
        c.set_daemon(true).unwrap();

        let t1 = Unit::builder(&c).name("T1").build().unwrap();
        t1.start().unwrap();
        assert!(!c.is_destroyed());

        substrate.finish(&t1, Ok(()));

        assert!(c.is_destroyed());
        assert!(!root.is_destroyed());
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn daemon_cascade_stops_at_a_non_daemon_ancestor() {
        let (tree, substrate) = tree();
        let a = Group::create(tree.root(), "A").unwrap();
        let b = Group::create(&a, "B").unwrap();
        b.set_daemon(true).unwrap();
        let c = Group::create(&b, "C").unwrap();
        assert!(c.is_daemon());

        let unit = Unit::builder(&c).build().unwrap();
        unit.start().unwrap();
        substrate.finish(&unit, Ok(()));

        assert!(c.is_destroyed());
        assert!(b.is_destroyed());
        assert!(!a.is_destroyed());
        assert_eq!(a.child_count(), 0);
    }

    #[test]
    fn root_is_never_auto_destroyed() {
        let (tree, substrate) = tree();
        let root = tree.root();
        root.set_daemon(true).unwrap();
        let unit = Unit::builder(root).build().unwrap();
        unit.start().unwrap();
        substrate.finish(&unit, Ok(()));
        assert!(!root.is_destroyed());
    }

    #[test]
    fn failed_begin_restores_counters_and_allows_retry() {
        let (tree, substrate) = tree();
        let g = Group::create(tree.root(), "G").unwrap();

        let unit = Unit::builder(&g).build().unwrap();
        let (members, unstarted) = (g.member_count(), g.unstarted_count());
        assert_eq!((members, unstarted), (0, 1));

        substrate.fail_next_begin(SubstrateError::new("no capacity"));
        let err = unit.start().unwrap_err();
        assert!(matches!(err, TreeError::Substrate(_)));
        assert_eq!((g.member_count(), g.unstarted_count()), (members, unstarted));

        unit.start().unwrap();
        assert_eq!((g.member_count(), g.unstarted_count()), (1, 0));
    }

    #[test]
    fn commit_rejects_duplicates_and_missing_reservations() {
        let (tree, _) = tree();
        let g = Group::create(tree.root(), "G").unwrap();
        let unit = Unit::builder(&g).build().unwrap();

        g.commit_member(&unit).unwrap();
        assert!(g.commit_member(&unit).unwrap_err().is_invalid_state());

        let other = Unit::builder(tree.root()).build().unwrap();
        assert!(g.commit_member(&other).unwrap_err().is_invalid_state());

        g.start_failed(&unit);
        assert_eq!((g.member_count(), g.unstarted_count()), (0, 1));
    }

    #[test]
    fn exited_unit_cannot_take_a_sibling_reservation() {
        let (tree, _) = tree();
        let g = Group::create(tree.root(), "G").unwrap();
        let sibling = Unit::builder(&g).build().unwrap();
        let unit = Unit::builder(&g).build().unwrap();
        assert_eq!(g.unstarted_count(), 2);

        unit.exit(Ok(()));
        assert_eq!(g.unstarted_count(), 1);
        assert!(g.commit_member(&unit).unwrap_err().is_invalid_state());
        assert!(unit.start().unwrap_err().is_invalid_state());
        assert_eq!((g.member_count(), g.unstarted_count()), (0, 1));

        sibling.start().unwrap();
        assert_eq!((g.member_count(), g.unstarted_count()), (1, 0));
    }

    #[test]
    fn destroy_requires_an_empty_group() {
        let (tree, substrate) = tree();
        let g = Group::create(tree.root(), "G").unwrap();

        let unit = Unit::builder(&g).build().unwrap();
        assert!(g.destroy().unwrap_err().is_invalid_state());

        unit.start().unwrap();
        assert!(g.destroy().unwrap_err().is_invalid_state());

        substrate.finish(&unit, Ok(()));
        let child = Group::create(&g, "child").unwrap();
        assert!(g.destroy().unwrap_err().is_invalid_state());

        child.destroy().unwrap();
        g.destroy().unwrap();
        assert!(g.is_destroyed());
        assert_eq!(tree.root().child_count(), 0);
        assert!(g.destroy().unwrap_err().is_invalid_state());
    }

    #[test]
    fn destroyed_group_rejects_new_work() {
        let (tree, _) = tree();
        let g = Group::create(tree.root(), "G").unwrap();
        g.destroy().unwrap();

        assert!(g.reserve_unstarted().unwrap_err().is_invalid_state());
        assert!(Group::create(&g, "late").unwrap_err().is_invalid_state());
        assert!(Unit::builder(&g).build().unwrap_err().is_invalid_state());
    }

    #[test]
    fn root_cannot_be_destroyed() {
        let (tree, _) = tree();
        assert!(tree.root().destroy().unwrap_err().is_invalid_state());
    }

    #[test]
    fn dropping_an_unstarted_unit_releases_its_reservation() {
        let (tree, _) = tree();
        let g = Group::create(tree.root(), "G").unwrap();
        g.set_daemon(true).unwrap();

        let unit = Unit::builder(&g).build().unwrap();
        assert_eq!(g.unstarted_count(), 1);
        drop(unit);

        assert_eq!(g.unstarted_count(), 0);
        assert!(g.is_destroyed());
    }

    #[test]
    fn access_denied_leaves_state_untouched() {
        let (tree, _) = {
            let substrate = Arc::new(ScriptedSubstrate::new());
            let tree = Tree::builder(TreeConfig::default())
                .with_substrate(substrate.clone())
                .with_access_control(Arc::new(|g: &Group| {
                    if g.name() == "sealed" {
                        Err(AccessDenied::new(g.name(), "sealed"))
                    } else {
                        Ok(())
                    }
                }))
                .build();
            (tree, substrate)
        };
        let sealed = Group::create(tree.root(), "sealed").unwrap();

        assert!(matches!(
            Group::create(&sealed, "x"),
            Err(TreeError::AccessDenied(_))
        ));
        assert!(matches!(sealed.set_daemon(true), Err(TreeError::AccessDenied(_))));
        assert!(!sealed.is_daemon());
        assert!(matches!(sealed.destroy(), Err(TreeError::AccessDenied(_))));
        assert!(!sealed.is_destroyed());
        assert_eq!(sealed.child_count(), 0);
    }

    #[test]
    fn concurrent_enumeration_sees_whole_snapshots() {
        let (tree, substrate) = tree();
        let g = Group::create(tree.root(), "G").unwrap();

        std::thread::scope(|s| {
            s.spawn(|| {
                for _ in 0..200 {
                    let unit = Unit::builder(&g).build().unwrap();
                    unit.start().unwrap();
                    substrate.finish(&unit, Ok(()));
                }
            });
            s.spawn(|| {
                for _ in 0..200 {
                    let mut out = Vec::new();
                    let n = g.enumerate(&mut out, false).unwrap();
                    assert_eq!(n, out.len());
                    assert!(n <= 1);
                }
            });
        });
        assert_eq!(g.member_count(), 0);
        assert_eq!(g.unstarted_count(), 0);
    }

    #[test]
    fn recursive_enumeration_tolerates_churn_below() {
        let (tree, substrate) = tree();
        let g = Group::create(tree.root(), "G").unwrap();
        let anchor = Unit::builder(&g).build().unwrap();
        anchor.start().unwrap();

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200 {
                    let child = Group::create(&g, format!("child-{i}")).unwrap();
                    let unit = Unit::builder(&child).build().unwrap();
                    unit.start().unwrap();
                    substrate.finish(&unit, Ok(()));
                    child.destroy().unwrap();
                }
            });
            s.spawn(|| {
                for _ in 0..200 {
                    let mut out = Vec::new();
                    let n = g.enumerate(&mut out, true).unwrap();
                    assert_eq!(n, out.len());
                    assert!((1..=2).contains(&n));
                    assert!(out.contains(&anchor));
                    assert!(g.count_groups(true) <= 1);
                }
            });
        });
        assert_eq!(g.child_count(), 0);
        assert_eq!(g.count_members(true), 1);
    }
}
