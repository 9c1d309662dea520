//! # Unit body abstraction.
//!
//! A [`Task`] is the code a unit executes once the substrate begins it. The
//! tree never runs bodies itself; the [`TokioSubstrate`](crate::TokioSubstrate)
//! does, handing each attempt a fresh [`UnitContext`].
//!
//! The common handle type is [`TaskRef`], an `Arc<dyn Task>` suitable for sharing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Failure;
use crate::tasks::UnitContext;

/// Boxed future returned by [`Task::spawn`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), Failure>> + Send + 'static>>;

/// Shared handle to a unit body.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, interruptible unit body.
///
/// Implementors should regularly check [`UnitContext::is_interrupted`] and
/// pass through [`UnitContext::checkpoint`] so that interrupt and suspend
/// requests are honored cooperatively.
///
/// # Example
/// ```
/// use groupvisor::{BoxTaskFuture, Task, UnitContext};
///
/// struct Tick;
///
/// impl Task for Tick {
///     fn spawn(&self, ctx: UnitContext) -> BoxTaskFuture {
///         Box::pin(async move {
///             while !ctx.is_interrupted() {
///                 ctx.checkpoint().await;
///                 tokio::task::yield_now().await;
///             }
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Creates the future for one execution of the body.
    fn spawn(&self, ctx: UnitContext) -> BoxTaskFuture;
}
