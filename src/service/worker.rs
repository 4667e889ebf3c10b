//! Worker abstraction: the background task a service supervises.
//!
//! A [`Worker`] performs the actual I/O/protocol work (a device session,
//! a frame feed, a command bus) and pushes produced messages into its
//! service's broker through the [`WorkerContext`].
//!
//! ## Contract
//! - Call [`WorkerContext::ready`] once the connection/setup is usable;
//!   until then the service stays `Starting` and readiness waiters block.
//! - Check [`WorkerContext::cancelled`] and exit promptly on shutdown,
//!   returning `Err(WorkerError::Canceled)` (or `Ok(())`).
//! - Return `Err(WorkerError::Fail { .. })` when the underlying
//!   connection dies; the service transitions to `Crashed` so callers can
//!   tell it apart from a clean stop.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::broker::Publisher;
use crate::error::WorkerError;
use crate::events::{Bus, Event, EventKind};

use super::state::RunState;

/// Background worker supervised by a [`Service`](crate::Service).
///
/// The same worker value is re-run across restarts, so keep per-run state
/// local to [`run`](Worker::run) (or behind interior mutability).
///
/// `as_any` enables the typed command-handle downcast after
/// [`ServiceManager::borrow`](crate::ServiceManager::borrow); the
/// implementation is always `fn as_any(&self) -> &dyn Any { self }`.
///
/// # Example
/// ```
/// use std::any::Any;
/// use async_trait::async_trait;
/// use servisor::{Worker, WorkerContext, WorkerError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Worker<String> for Heartbeat {
///     async fn run(&self, ctx: WorkerContext<String>) -> Result<(), WorkerError> {
///         ctx.ready();
///         loop {
///             tokio::select! {
///                 _ = ctx.cancelled() => return Err(WorkerError::Canceled),
///                 _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {
///                     ctx.publish("alive".to_string());
///                 }
///             }
///         }
///     }
///
///     fn as_any(&self) -> &dyn Any { self }
/// }
/// ```
#[async_trait]
pub trait Worker<M: Clone + Send + 'static>: Send + Sync + 'static {
    /// Executes one run of the worker until completion or cancellation.
    async fn run(&self, ctx: WorkerContext<M>) -> Result<(), WorkerError>;

    /// Upcast for the typed worker access behind `borrow`.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle type for workers.
pub type WorkerRef<M> = Arc<dyn Worker<M>>;

/// Per-run context handed to [`Worker::run`].
///
/// Carries the cancellation token for this run, the publisher into the
/// current broker generation, and the readiness signal.
pub struct WorkerContext<M> {
    cancel: CancellationToken,
    publisher: Publisher<M>,
    ready: ReadySignal,
}

impl<M: Clone + Send + 'static> WorkerContext<M> {
    pub(crate) fn new(
        cancel: CancellationToken,
        publisher: Publisher<M>,
        ready: ReadySignal,
    ) -> Self {
        Self {
            cancel,
            publisher,
            ready,
        }
    }

    /// Signals that this run is fully initialized.
    ///
    /// Flips the service from `Starting` to `Running` and wakes every
    /// readiness waiter. Calling it again (or after a stop began) is a
    /// no-op.
    pub fn ready(&self) {
        self.ready.signal();
    }

    /// Publishes a message into the service's broker.
    pub fn publish(&self, msg: M) {
        self.publisher.publish(msg);
    }

    /// Returns the publisher for this run (cheap to clone).
    pub fn publisher(&self) -> &Publisher<M> {
        &self.publisher
    }

    /// Returns `true` once a stop has been requested for this run.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes when a stop is requested for this run.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Returns the cancellation token for this run.
    ///
    /// Useful for handing to nested I/O helpers.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Readiness signal wired back into the owning service.
pub(crate) struct ReadySignal {
    state: Arc<watch::Sender<RunState>>,
    bus: Bus,
    service: Arc<str>,
}

impl ReadySignal {
    pub(crate) fn new(state: Arc<watch::Sender<RunState>>, bus: Bus, service: Arc<str>) -> Self {
        Self {
            state,
            bus,
            service,
        }
    }

    fn signal(&self) {
        let mut flipped = false;
        self.state.send_modify(|state| {
            if *state == RunState::Starting {
                *state = RunState::Running;
                flipped = true;
            }
        });
        if flipped {
            self.bus
                .publish(Event::new(EventKind::ServiceReady).with_service(self.service.clone()));
        }
    }
}
