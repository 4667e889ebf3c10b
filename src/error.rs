//! Error types used by the servisor runtime and workers.
//!
//! This module defines three error types:
//!
//! - [`SvcError`] — errors returned by manager and service operations.
//! - [`WorkerError`] — errors returned by worker executions.
//! - [`RestartAllError`] — aggregate failure of a batch restart.
//!
//! All types provide `as_label()` returning a short stable snake_case
//! label for logs/metrics.

use std::time::Duration;

use thiserror::Error;

use crate::service::RunState;

/// # Errors produced by manager and service operations.
///
/// Every fallible operation on [`ServiceManager`](crate::ServiceManager)
/// or [`Service`](crate::Service) resolves to one of these variants.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SvcError {
    /// Operation referenced a name that was never registered.
    #[error("service not found: {name}")]
    NotFound {
        /// The unregistered name.
        name: String,
    },

    /// Duplicate registration attempt; the original registration is untouched.
    #[error("service already registered: {name}")]
    AlreadyRegistered {
        /// The name that is already taken.
        name: String,
    },

    /// A command was issued to a service that is not in a usable state.
    ///
    /// This is policy-level: the registry never raises it on its own, only
    /// [`Borrowed::require_running`](crate::Borrowed::require_running) does.
    #[error("service {name} is not running (state: {state:?})")]
    ServiceStopped {
        /// Service name.
        name: String,
        /// State observed at the time of the check.
        state: RunState,
    },

    /// A readiness bound elapsed before the service reached `Running`.
    #[error("service {name} not ready within {timeout:?}")]
    ReadyTimeout {
        /// Service name.
        name: String,
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// The worker terminated unexpectedly; surfaced via state, never
    /// swallowed as a clean stop.
    #[error("service {name} worker crashed")]
    Crashed {
        /// Service name.
        name: String,
    },
}

impl SvcError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SvcError::NotFound { .. } => "svc_not_found",
            SvcError::AlreadyRegistered { .. } => "svc_already_registered",
            SvcError::ServiceStopped { .. } => "svc_stopped",
            SvcError::ReadyTimeout { .. } => "svc_ready_timeout",
            SvcError::Crashed { .. } => "svc_crashed",
        }
    }

    /// Returns the service name the error refers to.
    pub fn service(&self) -> &str {
        match self {
            SvcError::NotFound { name }
            | SvcError::AlreadyRegistered { name }
            | SvcError::ServiceStopped { name, .. }
            | SvcError::ReadyTimeout { name, .. }
            | SvcError::Crashed { name } => name,
        }
    }
}

/// # Errors produced by worker executions.
///
/// Returned from [`Worker::run`](crate::Worker::run). `Canceled` is the
/// graceful exit path during shutdown; `Fail` marks the run as crashed.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker observed cancellation and exited cooperatively.
    ///
    /// Treated as a clean stop, not a crash.
    #[error("context cancelled")]
    Canceled,

    /// Worker run failed (connection lost, protocol error, ...).
    ///
    /// The owning service transitions to `Crashed` unless a stop was
    /// already requested.
    #[error("worker failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl WorkerError {
    /// Convenience constructor for [`WorkerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        WorkerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Canceled => "worker_canceled",
            WorkerError::Fail { .. } => "worker_failed",
        }
    }

    /// Returns `true` for exits that count as a clean stop.
    pub fn is_graceful(&self) -> bool {
        matches!(self, WorkerError::Canceled)
    }
}

/// # Aggregate failure of [`ServiceManager::restart_all`](crate::ServiceManager::restart_all).
///
/// Restarts are best-effort and independent per service; this error
/// enumerates exactly the services that failed, the rest were restarted.
#[derive(Error, Debug)]
#[error("{} service(s) failed to restart: {}", .failures.len(), failed_names(.failures))]
pub struct RestartAllError {
    /// Per-service failures, sorted by service name.
    pub failures: Vec<(String, SvcError)>,
}

impl RestartAllError {
    /// Returns the names of the services that failed.
    pub fn names(&self) -> Vec<&str> {
        self.failures.iter().map(|(name, _)| name.as_str()).collect()
    }
}

fn failed_names(failures: &[(String, SvcError)]) -> String {
    failures
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = SvcError::NotFound {
            name: "pppp".into(),
        };
        assert_eq!(err.as_label(), "svc_not_found");
        assert_eq!(err.service(), "pppp");

        let err = WorkerError::fail("boom");
        assert_eq!(err.as_label(), "worker_failed");
        assert!(!err.is_graceful());
        assert!(WorkerError::Canceled.is_graceful());
    }

    #[test]
    fn restart_all_lists_failed_services() {
        let err = RestartAllError {
            failures: vec![
                (
                    "mqtt".to_string(),
                    SvcError::ReadyTimeout {
                        name: "mqtt".into(),
                        timeout: Duration::from_secs(1),
                    },
                ),
                (
                    "video".to_string(),
                    SvcError::Crashed {
                        name: "video".into(),
                    },
                ),
            ],
        };
        assert_eq!(err.names(), vec!["mqtt", "video"]);
        let msg = err.to_string();
        assert!(msg.contains("mqtt"));
        assert!(msg.contains("video"));
    }
}
