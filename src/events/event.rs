//! Lifecycle events emitted by services and the manager.
//!
//! [`EventKind`] classifies the transitions of the per-service state
//! machine plus registry-level operations. [`Event`] carries the metadata:
//! timestamp, service name, optional reason.
//!
//! ## Ordering
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically; use it to restore order when events are logged from
//! multiple observers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A service was inserted into the registry (initial state `Stopped`).
    ServiceRegistered,

    /// A service entered `Starting`; its worker was spawned.
    ServiceStarting,

    /// The worker signaled readiness; the service is `Running`.
    ServiceReady,

    /// A stop was requested; the service entered `Stopping`.
    ServiceStopping,

    /// The service reached `Stopped` (clean stop or worker self-exit).
    ServiceStopped,

    /// The worker terminated unexpectedly; the service is `Crashed`.
    ///
    /// Sets `reason` to the worker's error message.
    ServiceCrashed,

    /// A restart was requested for a service.
    ServiceRestartRequested,

    /// The stop grace period elapsed and the worker was aborted.
    GraceExceeded,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `service`/`reason`: set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the service, if applicable.
    pub service: Option<Arc<str>>,
    /// Human-readable reason (crash message, abort details, ...).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp
    /// and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            reason: None,
        }
    }

    /// Attaches a service name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
