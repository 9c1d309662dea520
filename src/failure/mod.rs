//! # Failure handling.
//!
//! - [`FailureHandler`] capability and [`HandlerRef`]
//! - process-wide default slot ([`set_default_handler`] / [`default_handler`])
//! - [`dispatch`]: unit handler, then group chain, then default, then fallback

mod default;
mod dispatch;
mod handler;

pub use default::{default_handler, set_default_handler};
pub use dispatch::dispatch;
pub use handler::{FailureHandler, HandlerRef};
