//! # Snapshot traversal.
//!
//! Every subtree-wide operation (ceiling cascade, bulk signals, counting,
//! enumeration, listing) goes through [`walk`]:
//!
//! ```text
//! pop node ──► enter(node)?            (no lock held; access checks go here)
//!          ──► lock(node)
//!                 visit(level)         (state borrowed under the node's lock)
//!                 copy children        (snapshot)
//!              unlock(node)
//!          ──► push snapshot (depth-first, pre-order)
//! ```
//!
//! No two node locks are ever held at once. Children added after a node's
//! snapshot are not visited; children removed after it still are.

use std::sync::Arc;

use super::group::{Group, GroupState};

/// One visited node, borrowed under its own lock.
pub(crate) struct Level<'a> {
    pub(crate) group: &'a Arc<Group>,
    pub(crate) state: &'a mut GroupState,
    pub(crate) depth: usize,
}

/// Walks `root` (and its descendants if `recursive`) in depth-first pre-order.
///
/// Stops at the first `enter` error; nodes visited before it keep their changes.
pub(crate) fn walk<E>(
    root: &Arc<Group>,
    recursive: bool,
    mut enter: impl FnMut(&Arc<Group>) -> Result<(), E>,
    mut visit: impl FnMut(Level<'_>),
) -> Result<(), E> {
    let mut pending = vec![(Arc::clone(root), 0usize)];

    while let Some((group, depth)) = pending.pop() {
        enter(&group)?;

        let children = {
            let mut st = group.state.lock();
            visit(Level {
                group: &group,
                state: &mut st,
                depth,
            });
            if recursive {
                st.children.clone()
            } else {
                Vec::new()
            }
        };
        pending.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }
    Ok(())
}
