//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used by the [`Tree`](crate::Tree) to deliver [`Event`](crate::Event)s.
//!
//! ## Architecture
//! ```text
//! Group / Unit ── publish(Event) ──► Bus ──► Tree listener ──► SubscriberSet::emit
//!                                                                 │
//!                                                   ┌─────────────┼──────────┐
//!                                                   ▼             ▼          ▼
//!                                               LogWriter      Metrics    Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
