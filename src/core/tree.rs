//! # Tree: owner of the root group, event delivery and graceful shutdown.
//!
//! The [`Tree`] wires the shared collaborators (config, substrate, access
//! control, event bus) into a root [`Group`] and optionally fans events out to
//! [`Subscribe`](crate::Subscribe) implementations.
//!
//! ## Architecture
//! ```text
//! Tree::builder(cfg)
//!   .with_substrate(..) .with_access_control(..) .with_subscribers(..)
//!   .build() ──► Context { cfg, substrate, access, bus, terminations }
//!                  └─► root Group ("system")
//!
//! Event flow:
//!   Group / Unit / dispatcher ── publish(Event) ──► Bus ──► Tree listener ──► SubscriberSet::emit
//!                                                     └──► Tree::subscribe() receivers
//!
//! Shutdown path:
//!   shutdown(grace) / run_until_signal()
//!     └─► Bus.publish(ShutdownRequested)
//!     └─► root.interrupt()                     (every unit of the tree)
//!     └─► wait for bookkeeping to drain within grace:
//!            ├─ Ok       → Bus.publish(AllStoppedWithin)
//!            └─ timeout  → Bus.publish(GraceExceeded), Err(GraceExceeded { stuck })
//!     └─► stop the listener (pending events are flushed to subscribers)
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use groupvisor::{Failure, Group, TaskFn, Tree, TreeConfig, Unit, UnitContext};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tree = Tree::builder(TreeConfig::default()).build();
//!     let workers = Group::create(tree.root(), "workers")?;
//!
//!     let unit = Unit::builder(&workers)
//!         .name("ticker")
//!         .body(TaskFn::arc(|ctx: UnitContext| async move {
//!             while !ctx.is_interrupted() {
//!                 ctx.checkpoint().await;
//!                 tokio::time::sleep(Duration::from_millis(10)).await;
//!             }
//!             Ok::<_, Failure>(())
//!         }))
//!         .build()?;
//!     unit.start()?;
//!
//!     tree.shutdown(Duration::from_secs(1)).await?;
//!     assert_eq!(workers.member_count(), 0);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::TreeBuilder;
use super::context::Context;
use super::shutdown;
use crate::core::TreeConfig;
use crate::error::TreeError;
use crate::events::{Bus, Event, EventKind};
use crate::group::Group;
use crate::subscribers::SubscriberSet;
use crate::unit::Unit;

/// One supervision tree.
pub struct Tree {
    ctx: Arc<Context>,
    root: Arc<Group>,
    token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Tree {
    /// Starts building a tree.
    pub fn builder(cfg: TreeConfig) -> TreeBuilder {
        TreeBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        ctx: Arc<Context>,
        root: Arc<Group>,
        token: CancellationToken,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            ctx,
            root,
            token,
            listener: Mutex::new(listener),
        }
    }

    /// The root group.
    pub fn root(&self) -> &Arc<Group> {
        &self.root
    }

    /// Tree configuration.
    pub fn config(&self) -> &TreeConfig {
        &self.ctx.cfg
    }

    /// Event bus shared by every group and unit.
    pub fn bus(&self) -> &Bus {
        &self.ctx.bus
    }

    /// Receiver for events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.ctx.bus.subscribe()
    }

    /// Human-readable dump of the whole tree.
    pub fn list(&self) -> String {
        self.root.list_tree()
    }

    /// All live units of the tree.
    pub fn live_units(&self) -> Result<Vec<Unit>, TreeError> {
        let mut out = Vec::new();
        self.root.enumerate(&mut out, true)?;
        Ok(out)
    }

    /// Interrupts every unit and waits up to `grace` for all of them to leave
    /// their groups.
    ///
    /// ### Errors
    /// - [`TreeError::AccessDenied`] if the interrupt is rejected at some level
    /// - [`TreeError::GraceExceeded`] with the names of the units still present
    pub async fn shutdown(&self, grace: Duration) -> Result<(), TreeError> {
        self.ctx.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.root.interrupt()?;

        let res = self.wait_drained(grace).await;
        self.close_listener().await;
        res
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then shuts down
    /// with the configured grace period.
    pub async fn run_until_signal(&self) -> Result<(), TreeError> {
        match shutdown::wait_for_shutdown_signal().await {
            Ok(signal) => tracing::info!(signal, "termination signal received"),
            Err(err) => tracing::warn!(%err, "signal listener unavailable; shutting down"),
        }
        self.shutdown(self.ctx.cfg.grace).await
    }

    async fn wait_drained(&self, grace: Duration) -> Result<(), TreeError> {
        let drained = async {
            loop {
                let notified = self.ctx.terminations.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.root.subtree_members().is_empty() {
                    break;
                }
                notified.await;
            }
        };

        match tokio::time::timeout(grace, drained).await {
            Ok(()) => {
                self.ctx.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck: Vec<String> = self
                    .root
                    .subtree_members()
                    .iter()
                    .map(|u| u.name().to_string())
                    .collect();
                tracing::warn!(?grace, ?stuck, "shutdown grace exceeded");
                self.ctx.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")),
                );
                Err(TreeError::GraceExceeded { grace, stuck })
            }
        }
    }

    async fn close_listener(&self) {
        self.token.cancel();
        let handle = self.listener.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Forwards bus events to the subscriber set until cancelled, then flushes
    /// what is already queued and shuts the workers down.
    pub(super) fn spawn_listener(bus: &Bus, set: SubscriberSet, token: CancellationToken) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "tree listener lagged behind the bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => break,
                }
            }
            while let Ok(ev) = rx.try_recv() {
                set.emit(&ev);
            }
            set.shutdown().await;
        })
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::error::{Failure, TreeError};
    use crate::events::{Event, EventKind};
    use crate::group::{Group, Signal};
    use crate::subscribers::Subscribe;
    use crate::substrate::ScriptedSubstrate;
    use crate::unit::Unit;
    use crate::{Tree, TreeConfig};

    struct Collect(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "collect"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_units_exceed_the_grace_period() {
        let substrate = Arc::new(ScriptedSubstrate::new());
        let tree = Tree::builder(TreeConfig::default())
            .with_substrate(substrate.clone())
            .build();
        let g = Group::create(tree.root(), "g").unwrap();
        let unit = Unit::builder(&g).name("sleepy").build().unwrap();
        unit.start().unwrap();

        let err = tree.shutdown(Duration::from_secs(3)).await.unwrap_err();
        match err {
            TreeError::GraceExceeded { grace, stuck } => {
                assert_eq!(grace, Duration::from_secs(3));
                assert_eq!(stuck, vec!["sleepy".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(substrate.requests_for(&unit), vec![Signal::Interrupt]);
    }

    #[tokio::test]
    async fn shutdown_returns_once_units_have_left() {
        let substrate = Arc::new(ScriptedSubstrate::new());
        let tree = Tree::builder(TreeConfig::default())
            .with_substrate(substrate.clone())
            .build();
        let unit = Unit::builder(tree.root()).build().unwrap();
        unit.start().unwrap();

        let finisher = {
            let substrate = Arc::clone(&substrate);
            let unit = unit.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                substrate.finish(&unit, Err(Failure::Canceled));
            })
        };

        tree.shutdown(Duration::from_secs(5)).await.unwrap();
        finisher.await.unwrap();
        assert_eq!(tree.root().member_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_see_the_shutdown_sequence() {
        let collect = Arc::new(Collect(Mutex::new(Vec::new())));
        let tree = Tree::builder(TreeConfig::default())
            .with_substrate(Arc::new(ScriptedSubstrate::new()))
            .with_subscribers(vec![collect.clone() as Arc<dyn Subscribe>])
            .build();
        let _g = Group::create(tree.root(), "g").unwrap();

        tree.shutdown(Duration::from_secs(1)).await.unwrap();

        let kinds = collect.0.lock().clone();
        assert_eq!(kinds.first(), Some(&EventKind::GroupCreated));
        assert!(kinds.contains(&EventKind::ShutdownRequested));
        assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
    }

    #[test]
    fn live_units_skips_dead_handles() {
        let substrate = Arc::new(ScriptedSubstrate::new());
        let tree = Tree::builder(TreeConfig::default())
            .with_substrate(substrate.clone())
            .build();
        let a = Unit::builder(tree.root()).build().unwrap();
        let b = Unit::builder(tree.root()).build().unwrap();
        a.start().unwrap();
        b.start().unwrap();
        substrate.kill(&b);

        assert_eq!(tree.live_units().unwrap(), vec![a]);
        assert!(tree.list().contains("Group[name=system"));
    }
}
