//! # Tokio-backed substrate.
//!
//! Each started unit becomes one tokio task:
//!
//! ```text
//! begin(unit)
//!   ├─ register RunHandle { interrupt, stop, suspend }
//!   └─ spawn ── CURRENT.scope(unit) ──► select! {
//!                                          body(ctx) (panics caught) ─► outcome
//!                                          stop.cancelled()          ─► Failure::Canceled
//!                                       }
//!                                       ├─ unregister
//!                                       └─ unit.exit(outcome)
//! ```
//!
//! - `request_interrupt` cancels the unit's interrupt token (observed through
//!   [`UnitContext`]); the body decides how to wind down.
//! - `request_stop` drops the body future at its next await point.
//! - `request_suspend` / `request_resume` flip a watch flag that
//!   [`UnitContext::checkpoint`] waits on.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::{select, task_local};
use tokio_util::sync::CancellationToken;

use super::Substrate;
use crate::error::{Failure, SubstrateError};
use crate::subscribers::panic_message;
use crate::tasks::UnitContext;
use crate::unit::{Unit, UnitId, UnitState};

task_local! {
    static CURRENT: Unit;
}

struct RunHandle {
    interrupt: CancellationToken,
    stop: CancellationToken,
    suspend: watch::Sender<bool>,
}

/// Runs unit bodies as tokio tasks.
///
/// Without an explicit handle, `begin` spawns onto the runtime of the calling
/// thread and fails with [`SubstrateError`] outside of one.
#[derive(Default)]
pub struct TokioSubstrate {
    running: Arc<Mutex<HashMap<UnitId, RunHandle>>>,
    handle: Option<Handle>,
}

impl TokioSubstrate {
    /// Spawns onto the caller's runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns onto `handle` regardless of the caller.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            running: Arc::default(),
            handle: Some(handle),
        }
    }

    /// Number of units currently executing.
    pub fn running(&self) -> usize {
        self.running.lock().len()
    }

    fn runtime(&self) -> Result<Handle, SubstrateError> {
        match &self.handle {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current()
                .map_err(|_| SubstrateError::new("no tokio runtime available")),
        }
    }

    fn on_running(&self, unit: &Unit, f: impl FnOnce(&RunHandle)) {
        if let Some(run) = self.running.lock().get(&unit.id()) {
            f(run);
        }
    }
}

impl Substrate for TokioSubstrate {
    fn begin(&self, unit: &Unit) -> Result<(), SubstrateError> {
        let rt = self.runtime()?;

        let interrupt = CancellationToken::new();
        let stop = CancellationToken::new();
        let (suspend, suspended) = watch::channel(false);
        {
            let mut running = self.running.lock();
            if running.contains_key(&unit.id()) {
                return Err(SubstrateError::new("unit is already running"));
            }
            running.insert(
                unit.id(),
                RunHandle {
                    interrupt: interrupt.clone(),
                    stop: stop.clone(),
                    suspend,
                },
            );
        }

        let body = unit.body();
        let ctx = UnitContext::new(unit.clone(), interrupt, suspended);
        let registry = Arc::clone(&self.running);
        let me = unit.clone();

        rt.spawn(CURRENT.scope(unit.clone(), async move {
            let outcome = match body {
                Some(task) => {
                    let fut = std::panic::AssertUnwindSafe(task.spawn(ctx)).catch_unwind();
                    tokio::pin!(fut);
                    select! {
                        res = &mut fut => match res {
                            Ok(outcome) => outcome,
                            Err(payload) => Err(Failure::Panicked {
                                message: panic_message(payload.as_ref()),
                            }),
                        },
                        _ = stop.cancelled() => Err(Failure::Canceled),
                    }
                }
                None => Ok(()),
            };

            registry.lock().remove(&me.id());
            me.exit(outcome);
        }));
        Ok(())
    }

    fn request_interrupt(&self, unit: &Unit) {
        self.on_running(unit, |run| run.interrupt.cancel());
    }

    fn request_stop(&self, unit: &Unit) {
        self.on_running(unit, |run| run.stop.cancel());
    }

    fn request_suspend(&self, unit: &Unit) {
        self.on_running(unit, |run| {
            run.suspend.send_replace(true);
        });
    }

    fn request_resume(&self, unit: &Unit) {
        self.on_running(unit, |run| {
            run.suspend.send_replace(false);
        });
    }

    fn is_alive(&self, unit: &Unit) -> bool {
        self.running.lock().contains_key(&unit.id())
    }

    fn current_state(&self, unit: &Unit) -> UnitState {
        match self.running.lock().get(&unit.id()) {
            Some(run) if *run.suspend.borrow() => UnitState::Waiting,
            Some(_) => UnitState::Runnable,
            None => UnitState::Terminated,
        }
    }

    fn current(&self) -> Option<Unit> {
        CURRENT.try_with(Unit::clone).ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::TokioSubstrate;
    use crate::error::{Failure, TreeError};
    use crate::group::Group;
    use crate::substrate::Substrate;
    use crate::tasks::{TaskFn, UnitContext};
    use crate::unit::{Unit, UnitState};
    use crate::{Tree, TreeConfig};

    fn tree() -> (Arc<Tree>, Arc<TokioSubstrate>) {
        let substrate = Arc::new(TokioSubstrate::new());
        let tree = Tree::builder(TreeConfig::default())
            .with_substrate(substrate.clone())
            .build();
        (tree, substrate)
    }

    #[test]
    fn begin_outside_a_runtime_fails_and_rolls_back() {
        let (tree, _) = tree();
        let unit = Unit::builder(tree.root()).build().unwrap();
        let err = unit.start().unwrap_err();
        assert!(matches!(err, TreeError::Substrate(_)));
        assert_eq!(tree.root().member_count(), 0);
        assert_eq!(tree.root().unstarted_count(), 1);
    }

    #[tokio::test]
    async fn finished_body_leaves_the_group() {
        let (tree, substrate) = tree();
        let g = Group::create(tree.root(), "g").unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let rx = Arc::new(parking_lot::Mutex::new(Some(rx)));

        let unit = Unit::builder(&g)
            .body(TaskFn::arc(move |_ctx: UnitContext| {
                let rx = rx.lock().take();
                async move {
                    if let Some(rx) = rx {
                        let _ = rx.await;
                    }
                    Ok::<_, Failure>(())
                }
            }))
            .build()
            .unwrap();
        unit.start().unwrap();
        assert!(substrate.is_alive(&unit));
        assert_eq!(g.count_members(false), 1);

        let _ = tx.send(());
        tree.shutdown(Duration::from_secs(5)).await.unwrap();
        assert_eq!(unit.state(), UnitState::Terminated);
        assert_eq!(g.member_count(), 0);
        assert_eq!(substrate.running(), 0);
    }

    #[tokio::test]
    async fn interrupt_is_observed_by_the_body() {
        let (tree, _) = tree();
        let unit = Unit::builder(tree.root())
            .body(TaskFn::arc(|ctx: UnitContext| async move {
                ctx.interrupted().await;
                Ok::<_, Failure>(())
            }))
            .build()
            .unwrap();
        unit.start().unwrap();

        tree.shutdown(Duration::from_secs(5)).await.unwrap();
        assert_eq!(unit.state(), UnitState::Terminated);
    }

    #[tokio::test]
    async fn stop_cancels_a_body_that_ignores_interrupts() {
        let (tree, _) = tree();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        tree.root()
            .set_failure_handler(Some(Arc::new(move |_: &Unit, f: &Failure| {
                sink.lock().push(f.clone());
            })))
            .unwrap();

        let unit = Unit::builder(tree.root())
            .body(TaskFn::arc(|_ctx: UnitContext| async move {
                std::future::pending::<()>().await;
                Ok::<_, Failure>(())
            }))
            .build()
            .unwrap();
        unit.start().unwrap();

        tree.root().stop().unwrap();
        tree.shutdown(Duration::from_secs(5)).await.unwrap();
        assert_eq!(*seen.lock(), vec![Failure::Canceled]);
    }

    fn explode() -> Result<(), Failure> {
        panic!("body blew up")
    }

    #[tokio::test]
    async fn panicking_body_is_reported_as_a_failure() {
        let (tree, _) = tree();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let unit = Unit::builder(tree.root())
            .failure_handler(Arc::new(move |_: &Unit, f: &Failure| {
                sink.lock().push(f.as_label());
            }))
            .body(TaskFn::arc(|_ctx: UnitContext| async move { explode() }))
            .build()
            .unwrap();
        unit.start().unwrap();

        tree.shutdown(Duration::from_secs(5)).await.unwrap();
        assert_eq!(*seen.lock(), vec!["unit_panicked"]);
    }

    #[tokio::test]
    async fn suspended_unit_waits_at_its_checkpoint() {
        let (tree, substrate) = tree();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<u32>();

        let unit = Unit::builder(tree.root())
            .body(TaskFn::arc(move |ctx: UnitContext| {
                let tx = tx.clone();
                async move {
                    let mut n = 0;
                    while !ctx.is_interrupted() {
                        ctx.checkpoint().await;
                        n += 1;
                        let _ = tx.send(n);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                    Ok::<_, Failure>(())
                }
            }))
            .build()
            .unwrap();
        unit.start().unwrap();
        assert!(rx.recv().await.is_some());

        tree.root().suspend().unwrap();
        assert_eq!(substrate.current_state(&unit), UnitState::Waiting);

        tree.root().resume().unwrap();
        assert_eq!(unit.state(), UnitState::Runnable);
        assert!(rx.recv().await.is_some());

        tree.shutdown(Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn current_unit_is_visible_inside_the_body() {
        let (tree, substrate) = tree();
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(parking_lot::Mutex::new(Some(tx)));
        let probe = Arc::clone(&substrate);

        let unit = Unit::builder(tree.root())
            .body(TaskFn::arc(move |_ctx: UnitContext| {
                let me = probe.current().map(|u| u.id());
                let tx = tx.lock().take();
                async move {
                    if let Some(tx) = tx {
                        let _ = tx.send(me);
                    }
                    Ok::<_, Failure>(())
                }
            }))
            .build()
            .unwrap();
        unit.start().unwrap();

        assert_eq!(rx.await.unwrap(), Some(unit.id()));
        assert!(substrate.current().is_none());
        tree.shutdown(Duration::from_secs(5)).await.unwrap();
    }
}
