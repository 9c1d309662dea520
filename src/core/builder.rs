use std::sync::Arc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::context::Context;
use super::tree::Tree;
use crate::access::{AccessControl, AllowAll};
use crate::core::TreeConfig;
use crate::events::Bus;
use crate::group::Group;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::substrate::{Substrate, TokioSubstrate};

/// Builder for a [`Tree`] with optional collaborators.
///
/// Defaults: [`TokioSubstrate`], [`AllowAll`], no subscribers.
#[must_use]
pub struct TreeBuilder {
    cfg: TreeConfig,
    substrate: Option<Arc<dyn Substrate>>,
    access: Option<Arc<dyn AccessControl>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl TreeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: TreeConfig) -> Self {
        Self {
            cfg,
            substrate: None,
            access: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the execution substrate.
    pub fn with_substrate(mut self, substrate: Arc<dyn Substrate>) -> Self {
        self.substrate = Some(substrate);
        self
    }

    /// Sets the access-control collaborator consulted before every mutation.
    pub fn with_access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = Some(access);
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive tree events through dedicated workers with bounded
    /// queues. A non-empty list requires [`build`](Self::build) to run inside
    /// a tokio runtime.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the tree and its root group.
    pub fn build(self) -> Arc<Tree> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let ctx = Arc::new(Context {
            substrate: self
                .substrate
                .unwrap_or_else(|| Arc::new(TokioSubstrate::new())),
            access: self.access.unwrap_or_else(|| Arc::new(AllowAll)),
            bus: bus.clone(),
            terminations: Notify::new(),
            cfg: self.cfg,
        });
        let token = CancellationToken::new();

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            Some(Tree::spawn_listener(&bus, set, token.clone()))
        };

        let root = Group::root(Arc::clone(&ctx));
        Arc::new(Tree::new_internal(ctx, root, token, listener))
    }
}
