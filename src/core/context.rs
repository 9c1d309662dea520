use std::sync::Arc;

use tokio::sync::Notify;

use crate::access::AccessControl;
use crate::core::TreeConfig;
use crate::error::TreeError;
use crate::events::Bus;
use crate::group::Group;
use crate::substrate::Substrate;

/// Collaborators shared by every group and unit of one tree.
pub(crate) struct Context {
    pub(crate) cfg: TreeConfig,
    pub(crate) substrate: Arc<dyn Substrate>,
    pub(crate) access: Arc<dyn AccessControl>,
    pub(crate) bus: Bus,
    /// Woken whenever a unit terminates.
    pub(crate) terminations: Notify,
}

impl Context {
    pub(crate) fn check(&self, group: &Group) -> Result<(), TreeError> {
        self.access.check_access(group).map_err(TreeError::from)
    }
}
