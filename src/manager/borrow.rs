//! Scoped, exclusive access to a service's command surface.
//!
//! [`Borrowed`] is the guard returned by
//! [`ServiceManager::borrow`](crate::ServiceManager::borrow). While it is
//! alive no other borrower holds the same service; the lock is released
//! on drop, on every exit path, including when the caller's code fails
//! partway through. Borrowing never contends with stream readers — those
//! go through the broker, not this lock.

use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;

use crate::error::SvcError;
use crate::service::{RunState, Service, Worker};

/// Exclusive guard over one service's command-issuing handle.
pub struct Borrowed<M: Clone + Send + 'static> {
    service: Arc<Service<M>>,
    _permit: OwnedMutexGuard<()>,
}

impl<M: Clone + Send + 'static> std::fmt::Debug for Borrowed<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Borrowed")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl<M: Clone + Send + 'static> Borrowed<M> {
    pub(crate) fn new(service: Arc<Service<M>>, permit: OwnedMutexGuard<()>) -> Self {
        Self {
            service,
            _permit: permit,
        }
    }

    /// Returns the borrowed service's name.
    pub fn name(&self) -> &str {
        self.service.name()
    }

    /// Returns the borrowed service's current state.
    pub fn state(&self) -> RunState {
        self.service.state()
    }

    /// Returns the borrowed service handle.
    pub fn service(&self) -> &Service<M> {
        &self.service
    }

    /// Downcasts the worker to its concrete type for issuing commands.
    ///
    /// Returns `None` when `W` is not the registered worker type:
    ///
    /// ```no_run
    /// # use servisor::{ServiceManager, SvcError};
    /// # struct VideoWorker; impl VideoWorker { fn set_light(&self, _on: bool) {} }
    /// # #[async_trait::async_trait]
    /// # impl servisor::Worker<Vec<u8>> for VideoWorker {
    /// #     async fn run(&self, _ctx: servisor::WorkerContext<Vec<u8>>) -> Result<(), servisor::WorkerError> { Ok(()) }
    /// #     fn as_any(&self) -> &dyn std::any::Any { self }
    /// # }
    /// # async fn demo(manager: &ServiceManager<Vec<u8>>) -> Result<(), SvcError> {
    /// let guard = manager.borrow("videoqueue").await?;
    /// if let Some(video) = guard.worker::<VideoWorker>() {
    ///     video.set_light(true);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn worker<W: Worker<M>>(&self) -> Option<&W> {
        self.service.worker_any().downcast_ref::<W>()
    }

    /// Policy helper: fails with [`SvcError::ServiceStopped`] unless the
    /// service is currently `Running`.
    ///
    /// The registry never enforces this on its own; concrete services
    /// that require a live connection for commands opt in.
    pub fn require_running(&self) -> Result<(), SvcError> {
        let state = self.state();
        if state == RunState::Running {
            Ok(())
        } else {
            Err(SvcError::ServiceStopped {
                name: self.name().to_string(),
                state,
            })
        }
    }
}
