//! Global runtime configuration.
//!
//! Provides [`Config`], the immutable settings value passed to
//! [`ServiceManager::new`](crate::ServiceManager::new) at startup.
//!
//! Config is used in two ways:
//! 1. **Manager creation**: bus capacity for lifecycle events.
//! 2. **Per-service defaults**: broker capacity, readiness bound and stop
//!    grace inherited by every [`ServiceSpec`](crate::ServiceSpec) that
//!    does not override them.

use std::time::Duration;

/// Immutable configuration for the service runtime.
///
/// ## Field semantics
/// - `broker_capacity`: per-service fan-out buffer size (min 1; clamped)
/// - `ready_timeout`: default bound for readiness waits
/// - `stop_grace`: how long `stop()` waits for a worker before aborting it
/// - `bus_capacity`: lifecycle event bus ring buffer size (min 1; clamped)
#[derive(Clone, Debug)]
pub struct Config {
    /// Default capacity of each service's message broker.
    ///
    /// When the buffer is full the oldest retained message is evicted;
    /// consumers that have not yet read it lose it.
    pub broker_capacity: usize,

    /// Default bound used by `ensure_running` and `restart_all(await_ready)`
    /// when waiting for a service to reach `Running`.
    pub ready_timeout: Duration,

    /// Maximum time `stop()` waits for a worker to exit cooperatively.
    ///
    /// A worker still running past the grace is aborted and a
    /// `GraceExceeded` event is published.
    pub stop_grace: Duration,

    /// Capacity of the lifecycle event bus broadcast channel.
    ///
    /// Observers that lag behind more than `bus_capacity` events skip the
    /// oldest items.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the broker capacity clamped to a minimum of 1.
    #[inline]
    pub fn broker_capacity_clamped(&self) -> usize {
        self.broker_capacity.max(1)
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `broker_capacity = 256` (live feeds, not an event log)
    /// - `ready_timeout = 10s`
    /// - `stop_grace = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            broker_capacity: 256,
            ready_timeout: Duration::from_secs(10),
            stop_grace: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}
