//! # Access control.
//!
//! Every mutating group operation, and every level visited by a bulk
//! operation, first asks the tree's [`AccessControl`] collaborator. A rejection
//! surfaces as [`TreeError::AccessDenied`](crate::TreeError::AccessDenied)
//! before any state changes at that level.
//!
//! Checks run with no group lock held.

use crate::error::AccessDenied;
use crate::group::Group;

/// Decides whether the caller may modify `group`.
///
/// Implemented for any `Fn(&Group) -> Result<(), AccessDenied>` closure.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use groupvisor::{AccessControl, AccessDenied, Group};
///
/// let policy: Arc<dyn AccessControl> = Arc::new(|g: &Group| {
///     if g.is_root() {
///         Err(AccessDenied::new(g.name(), "root is read-only"))
///     } else {
///         Ok(())
///     }
/// });
/// # let _ = policy;
/// ```
pub trait AccessControl: Send + Sync + 'static {
    /// Returns `Ok(())` if the caller may modify `group`.
    fn check_access(&self, group: &Group) -> Result<(), AccessDenied>;
}

/// Permits every operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AccessControl for AllowAll {
    fn check_access(&self, _group: &Group) -> Result<(), AccessDenied> {
        Ok(())
    }
}

impl<F> AccessControl for F
where
    F: Fn(&Group) -> Result<(), AccessDenied> + Send + Sync + 'static,
{
    fn check_access(&self, group: &Group) -> Result<(), AccessDenied> {
        self(group)
    }
}
