//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos; implement a custom [`Subscribe`] for structured
//! logging or metrics.
//!
//! ## Example output
//! ```text
//! [group-created] group="workers" ceiling=10
//! [unit-started] group="workers" unit="worker-1"
//! [start-failed] group="workers" unit="worker-2" reason="no capacity"
//! [unit-terminated] group="workers" unit="worker-1"
//! [group-destroyed] group="workers" reason="daemon_empty"
//! [unhandled-failure] unit="worker-3" failure="error: boom"
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn show(v: &Option<std::sync::Arc<str>>) -> &str {
    v.as_deref().unwrap_or("-")
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::GroupCreated => {
                println!(
                    "[group-created] group={:?} ceiling={:?}",
                    show(&e.group),
                    e.priority
                );
            }
            EventKind::GroupDestroyed => {
                println!(
                    "[group-destroyed] group={:?} reason={:?}",
                    show(&e.group),
                    show(&e.reason)
                );
            }
            EventKind::DaemonChanged => {
                println!("[daemon] group={:?} {}", show(&e.group), show(&e.reason));
            }
            EventKind::CeilingChanged => {
                println!(
                    "[ceiling] group={:?} ceiling={:?}",
                    show(&e.group),
                    e.priority
                );
            }
            EventKind::UnitCreated => {
                println!(
                    "[unit-created] group={:?} unit={:?} priority={:?}",
                    show(&e.group),
                    show(&e.unit),
                    e.priority
                );
            }
            EventKind::UnitStarted => {
                println!(
                    "[unit-started] group={:?} unit={:?}",
                    show(&e.group),
                    show(&e.unit)
                );
            }
            EventKind::UnitStartFailed => {
                println!(
                    "[start-failed] group={:?} unit={:?} reason={:?}",
                    show(&e.group),
                    show(&e.unit),
                    show(&e.reason)
                );
            }
            EventKind::UnitTerminated => {
                println!(
                    "[unit-terminated] group={:?} unit={:?}",
                    show(&e.group),
                    show(&e.unit)
                );
            }
            EventKind::SignalRequested => {
                println!(
                    "[signal] group={:?} signal={:?}",
                    show(&e.group),
                    e.signal
                );
            }
            EventKind::FailureUnhandled => {
                println!(
                    "[unhandled-failure] unit={:?} failure={:?}",
                    show(&e.unit),
                    show(&e.reason)
                );
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::AllStoppedWithin => {
                println!("[all-stopped-within-grace]");
            }
            EventKind::GraceExceeded => {
                println!("[grace-exceeded] stuck={:?}", show(&e.reason));
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] {}", show(&e.reason));
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] {}", show(&e.reason));
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
