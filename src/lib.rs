//! # groupvisor
//!
//! **Groupvisor** keeps a hierarchical supervision tree of execution units.
//!
//! Units are created inside groups, groups nest inside groups, and every unit
//! and group belongs to exactly one parent. The tree supports bulk control of
//! whole subtrees, hierarchical priority ceilings, self-destroying daemon
//! groups, and failure escalation from a unit up through its ancestors.
//!
//! The tree does not run anything itself. A [`Substrate`] executes units
//! ([`TokioSubstrate`] by default) and reports back when they finish.
//!
//! ## Architecture
//! ### Overview
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  Tree (façade)                                                     │
//! │  - Context: TreeConfig, Substrate, AccessControl, Bus              │
//! │  - root Group "system"                                             │
//! │  - listener: Bus ─► SubscriberSet (optional)                       │
//! └──────────────┬─────────────────────────────────────────────────────┘
//!                ▼
//!        ┌───────────────┐
//!        │ Group system  │  ceiling=10
//!        └──┬─────────┬──┘
//!           ▼         ▼
//!   ┌─────────────┐  ┌──────────────┐
//!   │ Group web   │  │ Group batch  │  daemon, ceiling=4
//!   └──┬──────────┘  └──┬───────────┘
//!      ▼                ▼
//!   Unit http-1      Unit job-7 ── exits ─► batch empty ─► batch destroyed
//! ```
//!
//! ### Unit lifecycle
//! ```text
//! Unit::builder(&group).build()      reserve_unstarted     (state New)
//!        │
//!        ▼
//! unit.start() ──► commit_member ──► substrate.begin
//!                                         ├─ Err ─► start_failed (rolled back, retry allowed)
//!                                         └─ Ok  ─► Runnable
//!                                                      │
//!                                    body finishes / stop / panic
//!                                                      ▼
//!                                   unit.exit(outcome)
//!                                     ├─ Err ─► dispatch: unit handler
//!                                     │                   ─► group chain ─► process default ─► fallback
//!                                     └─ group.terminated ─► daemon cascade upwards
//! ```
//!
//! ## Locking
//! Each group has its own lock and no operation ever holds two of them. Bulk
//! operations copy a node's children under its lock, release it and then
//! descend.
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                              |
//! |-------------------|-----------------------------------------------------------------|-------------------------------------------------|
//! | **Tree**          | Root ownership, events, graceful shutdown.                      | [`Tree`], [`TreeBuilder`], [`TreeConfig`]       |
//! | **Groups**        | Membership bookkeeping, daemon cascade, bulk operations.        | [`Group`], [`Signal`]                           |
//! | **Units**         | Start/exit protocol, attribute inheritance.                     | [`Unit`], [`UnitBuilder`], [`UnitState`]        |
//! | **Failures**      | Handler chain with a process-wide default.                      | [`FailureHandler`], [`dispatch`]                |
//! | **Substrates**    | Pluggable execution.                                            | [`Substrate`], [`TokioSubstrate`], [`ScriptedSubstrate`] |
//! | **Access**        | Pre-mutation permission checks.                                 | [`AccessControl`], [`AllowAll`]                 |
//! | **Subscriber API**| Hook into tree events (logging, metrics, custom subscribers).   | [`Subscribe`], [`Event`]                        |
//! | **Errors**        | Typed errors for tree operations and unit failures.             | [`TreeError`], [`Failure`]                      |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use groupvisor::{Failure, Group, TaskFn, Tree, TreeConfig, Unit, UnitContext};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn groupvisor::Subscribe>> = vec![Arc::new(groupvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn groupvisor::Subscribe>> = Vec::new();
//!
//!     let tree = Tree::builder(TreeConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let batch = Group::create(tree.root(), "batch")?;
//!     batch.set_daemon(true)?;
//!     batch.set_priority_ceiling(4)?;
//!
//!     let job = Unit::builder(&batch)
//!         .name("job-7")
//!         .body(TaskFn::arc(|_ctx: UnitContext| async move {
//!             println!("working");
//!             Ok::<_, Failure>(())
//!         }))
//!         .build()?;
//!     assert_eq!(job.priority(), 4);
//!     job.start()?;
//!
//!     tree.shutdown(Duration::from_secs(5)).await?;
//!     assert!(batch.is_destroyed());
//!     Ok(())
//! }
//! ```

mod access;
mod core;
mod error;
mod events;
mod failure;
mod group;
mod substrate;
mod subscribers;
mod tasks;
mod unit;

// ---- Public re-exports ----

pub use crate::access::{AccessControl, AllowAll};
pub use crate::core::{Tree, TreeBuilder, TreeConfig};
pub use crate::error::{AccessDenied, Failure, SubstrateError, TreeError};
pub use crate::events::{Bus, Event, EventKind};
pub use crate::failure::{FailureHandler, HandlerRef, default_handler, dispatch, set_default_handler};
pub use crate::group::{Group, Signal};
pub use crate::substrate::{ScriptedSubstrate, Substrate, TokioSubstrate};
pub use crate::subscribers::{Subscribe, SubscriberSet};
pub use crate::tasks::{BoxTaskFuture, Task, TaskFn, TaskRef, UnitContext};
pub use crate::unit::{Unit, UnitBuilder, UnitId, UnitState};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use crate::subscribers::LogWriter;
