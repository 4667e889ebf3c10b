//! Run state of a supervised service.
//!
//! Exactly one value at any instant per service:
//!
//! ```text
//! Stopped ──► Starting ──► Running ──► Stopping ──► Stopped
//!    ▲            │           │
//!    │            ▼           ▼
//!    └──────── Crashed ◄──────┘   (unexpected worker termination)
//! ```
//!
//! `Crashed` is distinct from `Stopped`: callers must be able to tell a
//! clean stop from a dead worker. `start()` is permitted from both.

use std::fmt;

/// Lifecycle state of a [`Service`](crate::Service).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No worker task; the service is idle.
    Stopped,
    /// Worker spawned, readiness not yet signaled.
    Starting,
    /// Worker signaled readiness and has not failed or been stopped since.
    Running,
    /// Stop requested; waiting for the worker to exit.
    Stopping,
    /// Worker terminated unexpectedly.
    Crashed,
}

impl RunState {
    /// Returns `true` if `start()` may launch a worker from this state.
    #[inline]
    pub fn can_start(&self) -> bool {
        matches!(self, RunState::Stopped | RunState::Crashed)
    }

    /// Returns `true` while a worker task exists (spawned and not reaped).
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunState::Starting | RunState::Running | RunState::Stopping
        )
    }

    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunState::Stopped => "stopped",
            RunState::Starting => "starting",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
            RunState::Crashed => "crashed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_permitted_from_stopped_and_crashed_only() {
        assert!(RunState::Stopped.can_start());
        assert!(RunState::Crashed.can_start());
        assert!(!RunState::Starting.can_start());
        assert!(!RunState::Running.can_start());
        assert!(!RunState::Stopping.can_start());
    }

    #[test]
    fn active_states_have_a_worker() {
        assert!(RunState::Starting.is_active());
        assert!(RunState::Running.is_active());
        assert!(RunState::Stopping.is_active());
        assert!(!RunState::Stopped.is_active());
        assert!(!RunState::Crashed.is_active());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(RunState::Running.as_label(), "running");
        assert_eq!(RunState::Crashed.to_string(), "crashed");
    }
}
