//! Tree events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by groups, units, the failure
//! dispatcher, the substrate and the tree façade.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Group` (create/destroy/ceiling/daemon/signal), `Unit`
//!   (create/start/start-failed/terminated), failure fallback, `Tree` shutdown,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the `Tree` listener (fans out to `SubscriberSet`) and any
//!   receiver obtained from `Tree::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
