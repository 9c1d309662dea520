//! Runtime core: configuration, shared context and the tree façade.
//!
//! The public API from this module is [`Tree`], [`TreeBuilder`] and [`TreeConfig`].
//!
//! Internal modules:
//! - [`context`]: collaborators shared by every node of one tree;
//! - [`tree`]: root ownership, event listener, graceful shutdown;
//! - [`builder`]: wiring of substrate, access control and subscribers;
//! - [`shutdown`]: cross-platform termination signal handling.

mod builder;
mod config;
mod context;
mod shutdown;
mod tree;

pub use builder::TreeBuilder;
pub use config::TreeConfig;
pub(crate) use context::Context;
pub use tree::Tree;
