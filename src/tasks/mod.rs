//! # Unit bodies.
//!
//! - [`Task`]: trait for asynchronous, interruptible unit bodies
//! - [`TaskFn`]: closure-backed body
//! - [`TaskRef`]: shared handle (`Arc<dyn Task>`)
//! - [`UnitContext`]: per-execution view of interrupt and suspend requests

mod context;
mod task;
mod task_fn;

pub use context::UnitContext;
pub use task::{BoxTaskFuture, Task, TaskRef};
pub use task_fn::TaskFn;
