//! Service specification for registration.
//!
//! Defines [`ServiceSpec`], the bundle handed to
//! [`ServiceManager::register`](crate::ServiceManager::register): a unique
//! name, the worker, and per-service knobs. Knobs left unset inherit
//! their defaults from the manager's [`Config`](crate::Config).

use std::time::Duration;

use crate::config::Config;

use super::worker::WorkerRef;

/// Specification for a supervised service.
///
/// ## Example
/// ```no_run
/// # use std::time::Duration;
/// # use servisor::{ServiceSpec, WorkerRef};
/// # fn demo(worker: WorkerRef<Vec<u8>>) {
/// let spec = ServiceSpec::new("videoqueue", worker)
///     .with_broker_capacity(64)
///     .with_ready_timeout(Duration::from_secs(15));
/// # }
/// ```
pub struct ServiceSpec<M: Clone + Send + 'static> {
    name: String,
    worker: WorkerRef<M>,
    broker_capacity: Option<usize>,
    ready_timeout: Option<Duration>,
    stop_grace: Option<Duration>,
}

impl<M: Clone + Send + 'static> ServiceSpec<M> {
    /// Creates a spec with the given unique name and worker.
    pub fn new(name: impl Into<String>, worker: WorkerRef<M>) -> Self {
        Self {
            name: name.into(),
            worker,
            broker_capacity: None,
            ready_timeout: None,
            stop_grace: None,
        }
    }

    /// Overrides the fan-out buffer capacity for this service.
    pub fn with_broker_capacity(mut self, capacity: usize) -> Self {
        self.broker_capacity = Some(capacity);
        self
    }

    /// Overrides the readiness bound for this service.
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = Some(timeout);
        self
    }

    /// Overrides the stop grace period for this service.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = Some(grace);
        self
    }

    /// Returns the service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self, cfg: &Config) -> SpecParts<M> {
        SpecParts {
            name: self.name,
            worker: self.worker,
            broker_capacity: self
                .broker_capacity
                .unwrap_or_else(|| cfg.broker_capacity_clamped())
                .max(1),
            ready_timeout: self.ready_timeout.unwrap_or(cfg.ready_timeout),
            stop_grace: self.stop_grace.unwrap_or(cfg.stop_grace),
        }
    }
}

/// Spec resolved against manager defaults.
pub(crate) struct SpecParts<M: Clone + Send + 'static> {
    pub(crate) name: String,
    pub(crate) worker: WorkerRef<M>,
    pub(crate) broker_capacity: usize,
    pub(crate) ready_timeout: Duration,
    pub(crate) stop_grace: Duration,
}
