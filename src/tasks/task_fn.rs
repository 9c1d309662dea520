//! # Function-backed body (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(UnitContext) -> Fut`, producing a fresh
//! future per execution. Shared state must be captured explicitly (`Arc<...>`).
//!
//! ## Example
//! ```rust
//! use groupvisor::{Failure, TaskFn, TaskRef, UnitContext};
//!
//! let body: TaskRef = TaskFn::arc(|ctx: UnitContext| async move {
//!     if ctx.is_interrupted() {
//!         return Ok(());
//!     }
//!     // do work...
//!     Ok::<_, Failure>(())
//! });
//! # let _ = body;
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::error::Failure;
use crate::tasks::UnitContext;
use crate::tasks::task::{BoxTaskFuture, Task};

/// Function-backed body implementation.
#[derive(Debug)]
pub struct TaskFn<F> {
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed body.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the body and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(UnitContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Failure>> + Send + 'static,
{
    fn spawn(&self, ctx: UnitContext) -> BoxTaskFuture {
        Box::pin((self.f)(ctx))
    }
}
