//! Error types used by the supervision tree and by running units.
//!
//! This module defines the error vocabulary of the crate:
//!
//! - [`TreeError`]: errors raised synchronously by tree operations
//!   (bookkeeping violations, access denial, substrate start failures, shutdown).
//! - [`AccessDenied`]: the access-control collaborator's rejection.
//! - [`SubstrateError`]: the execution substrate could not begin a unit.
//! - [`Failure`]: an uncaught failure of a running unit, routed through the
//!   failure dispatcher instead of being returned to anyone.
//!
//! Every type provides `as_label` (stable snake_case label for logs/metrics)
//! and `as_message` helpers.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// # Errors produced by supervision-tree operations.
///
/// All of these are local and synchronous: they are returned to the immediate
/// caller and never retried automatically.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Operation attempted outside the legal state of a unit or group
    /// (double start, destroy of a non-empty group, mutation of a destroyed group).
    #[error("invalid state: {reason}")]
    InvalidState {
        /// What was violated.
        reason: &'static str,
    },

    /// The access-control collaborator rejected the operation before any state changed.
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    /// The substrate could not begin a unit; bookkeeping was already rolled back.
    #[error(transparent)]
    Substrate(#[from] SubstrateError),

    /// Shutdown grace period was exceeded; some units were still alive.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The grace duration that was waited.
        grace: Duration,
        /// Names of the units still alive when the grace period ran out.
        stuck: Vec<String>,
    },
}

impl TreeError {
    pub(crate) const fn invalid(reason: &'static str) -> Self {
        TreeError::InvalidState { reason }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use groupvisor::TreeError;
    /// use std::time::Duration;
    ///
    /// let err = TreeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "tree_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TreeError::InvalidState { .. } => "tree_invalid_state",
            TreeError::AccessDenied(_) => "tree_access_denied",
            TreeError::Substrate(_) => "tree_substrate_failed",
            TreeError::GraceExceeded { .. } => "tree_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TreeError::InvalidState { reason } => format!("invalid state: {reason}"),
            TreeError::AccessDenied(denied) => denied.as_message(),
            TreeError::Substrate(err) => err.as_message(),
            TreeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck units={stuck:?}")
            }
        }
    }

    /// True for [`TreeError::InvalidState`].
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, TreeError::InvalidState { .. })
    }
}

/// Rejection returned by an [`AccessControl`](crate::AccessControl) collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("access denied on group {group:?}: {reason}")]
pub struct AccessDenied {
    /// Name of the group the check was performed against.
    pub group: Arc<str>,
    /// Policy-specific explanation.
    pub reason: String,
}

impl AccessDenied {
    /// Creates a rejection for `group`.
    pub fn new(group: impl Into<Arc<str>>, reason: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            reason: reason.into(),
        }
    }

    /// Returns a human-readable message with details about the rejection.
    pub fn as_message(&self) -> String {
        format!("access denied: group={} reason={}", self.group, self.reason)
    }
}

/// The execution substrate could not begin a unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("substrate could not begin unit: {message}")]
pub struct SubstrateError {
    /// Substrate-specific explanation.
    pub message: String,
}

impl SubstrateError {
    /// Creates a new substrate error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        format!("substrate: {}", self.message)
    }
}

/// # Uncaught failure of a running unit.
///
/// A failure never flows back into tree-mutation code. The substrate hands it
/// to [`Unit::exit`](crate::Unit::exit), which routes it through the failure
/// dispatcher (unit handler → group chain → process default → fallback).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The unit body returned an error.
    #[error("{message}")]
    Error {
        /// Failure description.
        message: String,
        /// Optional captured trace, rendered verbatim by the fallback diagnostic.
        trace: Option<Arc<str>>,
    },

    /// The unit body panicked.
    #[error("panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// Cooperative-cancellation sentinel: the unit was stopped on request.
    ///
    /// The fallback policy ignores this failure silently.
    #[error("unit cancelled")]
    Canceled,
}

impl Failure {
    /// Creates a [`Failure::Error`] without a trace.
    pub fn error(message: impl Into<String>) -> Self {
        Failure::Error {
            message: message.into(),
            trace: None,
        }
    }

    /// Attaches a trace to a [`Failure::Error`]; other variants are returned unchanged.
    pub fn with_trace(self, trace: impl Into<Arc<str>>) -> Self {
        match self {
            Failure::Error { message, .. } => Failure::Error {
                message,
                trace: Some(trace.into()),
            },
            other => other,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use groupvisor::Failure;
    ///
    /// assert_eq!(Failure::error("boom").as_label(), "unit_failed");
    /// assert_eq!(Failure::Canceled.as_label(), "unit_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Failure::Error { .. } => "unit_failed",
            Failure::Panicked { .. } => "unit_panicked",
            Failure::Canceled => "unit_canceled",
        }
    }

    /// Returns a human-readable message including the trace, if any.
    pub fn as_message(&self) -> String {
        match self {
            Failure::Error {
                message,
                trace: Some(trace),
            } => format!("error: {message}\n{trace}"),
            Failure::Error {
                message,
                trace: None,
            } => format!("error: {message}"),
            Failure::Panicked { message } => format!("panic: {message}"),
            Failure::Canceled => "cancelled".to_string(),
        }
    }

    /// True for the cooperative-cancellation sentinel.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Failure::Canceled)
    }
}
