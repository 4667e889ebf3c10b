//! Supervised service: one named worker, one broker, one state machine.
//!
//! ## Lifecycle wiring
//! ```text
//! start():
//!   reap previous monitor ─► state = Starting ─► broker.open()
//!     ─► spawn worker(ctx) ─► spawn monitor(worker join)
//!
//! monitor (worker exited on its own):
//!   Ok / Canceled   ─► close generation ─► state = Stopped
//!   Fail / panic    ─► state = Crashed   (generation stays open; readers
//!                                         detect staleness via idle bound)
//!
//! stop():
//!   state = Stopping ─► cancel ─► broker.close() ─► join with grace
//!     ├─ joined        ─► state = Stopped
//!     └─ grace elapsed ─► abort worker ─► GraceExceeded ─► state = Stopped
//! ```
//!
//! ## Rules
//! - At most one worker task per service: `start`/`stop`/`restart` are
//!   serialized on the lifecycle lock, and `restart` holds it across both
//!   halves so no caller observes a usable intermediate handle.
//! - `stop` closes the broker before joining the worker, so blocked
//!   stream readers are released promptly rather than when the worker
//!   notices cancellation.
//! - The state watch is the single source of truth; `await_ready` is a
//!   watch wait, never a poll loop.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::broker::{Broker, Cursor, Publisher};
use crate::error::{SvcError, WorkerError};
use crate::events::{Bus, Event, EventKind};

use super::spec::SpecParts;
use super::state::RunState;
use super::worker::{ReadySignal, WorkerContext, WorkerRef};

/// Handles of the currently spawned worker run.
struct Lifecycle {
    cancel: CancellationToken,
    worker_abort: Option<AbortHandle>,
    monitor: Option<JoinHandle<()>>,
}

/// How a worker run ended, as seen by the monitor.
enum Verdict {
    Clean,
    Failed(String),
}

/// A named, independently running background worker with fan-out output.
///
/// Created by [`ServiceManager::register`](crate::ServiceManager::register);
/// external callers interact with it through the manager or the `Arc`
/// returned by [`get`](crate::ServiceManager::get).
pub struct Service<M: Clone + Send + 'static> {
    name: Arc<str>,
    worker: WorkerRef<M>,
    broker: Broker<M>,
    state: Arc<watch::Sender<RunState>>,
    lifecycle: Mutex<Lifecycle>,
    borrow_lock: Arc<Mutex<()>>,
    bus: Bus,
    ready_timeout: Duration,
    stop_grace: Duration,
}

impl<M: Clone + Send + 'static> std::fmt::Debug for Service<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<M: Clone + Send + 'static> Service<M> {
    pub(crate) fn new(parts: SpecParts<M>, bus: Bus) -> Arc<Self> {
        let (state, _) = watch::channel(RunState::Stopped);
        Arc::new(Self {
            name: Arc::from(parts.name.as_str()),
            worker: parts.worker,
            broker: Broker::new(parts.broker_capacity),
            state: Arc::new(state),
            lifecycle: Mutex::new(Lifecycle {
                cancel: CancellationToken::new(),
                worker_abort: None,
                monitor: None,
            }),
            borrow_lock: Arc::new(Mutex::new(())),
            bus,
            ready_timeout: parts.ready_timeout,
            stop_grace: parts.stop_grace,
        })
    }

    /// Returns the unique service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current run state.
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Returns a watch receiver observing state transitions.
    pub fn watch(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Returns the default readiness bound for this service.
    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    /// Launches the worker if the service is `Stopped` or `Crashed`.
    ///
    /// Returns without blocking on readiness; no-op when a worker is
    /// already active.
    pub async fn start(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        self.start_locked(&mut lifecycle).await;
    }

    /// Stops the worker, transitioning through `Stopping` to `Stopped`.
    ///
    /// Closes the broker first so every pending stream read observes
    /// end-of-sequence within the stop grace, never indefinitely. A worker
    /// stuck past the grace is aborted.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        self.stop_locked(&mut lifecycle).await;
    }

    /// Stops and starts the worker as one operation.
    ///
    /// The lifecycle lock is held across both halves, so concurrent
    /// `start`/`stop`/`restart` callers cannot interleave with it.
    pub async fn restart(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        self.bus.publish(
            Event::new(EventKind::ServiceRestartRequested).with_service(self.name.clone()),
        );
        self.stop_locked(&mut lifecycle).await;
        self.start_locked(&mut lifecycle).await;
    }

    /// Blocks until the state becomes `Running`.
    ///
    /// Callable repeatedly and concurrently with `start`. Fails with
    /// [`SvcError::ReadyTimeout`] when the bound elapses first, or
    /// [`SvcError::Crashed`] if the worker dies while waiting.
    pub async fn await_ready(&self, timeout: Duration) -> Result<(), SvcError> {
        let mut rx = self.state.subscribe();
        let wait = async {
            loop {
                match *rx.borrow_and_update() {
                    RunState::Running => return Ok(()),
                    RunState::Crashed => {
                        return Err(SvcError::Crashed {
                            name: self.name.to_string(),
                        });
                    }
                    _ => {}
                }
                if rx.changed().await.is_err() {
                    return Err(SvcError::Crashed {
                        name: self.name.to_string(),
                    });
                }
            }
        };
        match time::timeout(timeout, wait).await {
            Ok(res) => res,
            Err(_) => Err(SvcError::ReadyTimeout {
                name: self.name.to_string(),
                timeout,
            }),
        }
    }

    /// Idempotent "ensure running": starts the worker if needed and waits
    /// up to the service's readiness bound.
    ///
    /// On [`SvcError::ReadyTimeout`] the state stays observable so the
    /// caller can decide on a full [`restart`](Service::restart).
    pub async fn ensure_running(&self) -> Result<(), SvcError> {
        if self.state() == RunState::Running {
            return Ok(());
        }
        self.start().await;
        self.await_ready(self.ready_timeout).await
    }

    /// Creates a fresh cursor at the tail of the current broker generation.
    pub async fn subscribe(&self) -> Cursor<M> {
        self.broker.subscribe().await
    }

    pub(crate) fn borrow_lock(&self) -> Arc<Mutex<()>> {
        self.borrow_lock.clone()
    }

    pub(crate) fn worker_any(&self) -> &dyn Any {
        self.worker.as_any()
    }

    async fn start_locked(&self, lifecycle: &mut Lifecycle) {
        if !self.state().can_start() {
            return;
        }
        self.reap(lifecycle).await;

        self.state.send_replace(RunState::Starting);
        self.bus
            .publish(Event::new(EventKind::ServiceStarting).with_service(self.name.clone()));

        let publisher = self.broker.open().await;
        let cancel = CancellationToken::new();
        let ctx = WorkerContext::new(
            cancel.child_token(),
            publisher.clone(),
            ReadySignal::new(self.state.clone(), self.bus.clone(), self.name.clone()),
        );

        let worker = self.worker.clone();
        let worker_join = tokio::spawn(async move { worker.run(ctx).await });
        let worker_abort = worker_join.abort_handle();

        let monitor = tokio::spawn(Self::monitor(
            worker_join,
            cancel.clone(),
            publisher,
            self.state.clone(),
            self.bus.clone(),
            self.name.clone(),
        ));

        lifecycle.cancel = cancel;
        lifecycle.worker_abort = Some(worker_abort);
        lifecycle.monitor = Some(monitor);
    }

    async fn stop_locked(&self, lifecycle: &mut Lifecycle) {
        match self.state() {
            RunState::Stopped => {
                self.reap(lifecycle).await;
                return;
            }
            RunState::Crashed => {
                // crash left the generation open for staleness detection;
                // an explicit stop ends it
                self.reap(lifecycle).await;
                self.broker.close().await;
                self.state.send_replace(RunState::Stopped);
                self.bus
                    .publish(Event::new(EventKind::ServiceStopped).with_service(self.name.clone()));
                return;
            }
            _ => {}
        }

        self.state.send_replace(RunState::Stopping);
        self.bus
            .publish(Event::new(EventKind::ServiceStopping).with_service(self.name.clone()));

        lifecycle.cancel.cancel();
        self.broker.close().await;

        if let Some(mut monitor) = lifecycle.monitor.take() {
            if time::timeout(self.stop_grace, &mut monitor).await.is_err() {
                if let Some(abort) = lifecycle.worker_abort.take() {
                    abort.abort();
                }
                self.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_service(self.name.clone()));
                let _ = monitor.await;
            }
        }
        lifecycle.worker_abort = None;

        self.state.send_replace(RunState::Stopped);
        self.bus
            .publish(Event::new(EventKind::ServiceStopped).with_service(self.name.clone()));
    }

    /// Joins a monitor left over from a finished run.
    async fn reap(&self, lifecycle: &mut Lifecycle) {
        if let Some(monitor) = lifecycle.monitor.take() {
            let _ = monitor.await;
        }
        lifecycle.worker_abort = None;
    }

    /// Observes the worker join handle and records the exit verdict.
    ///
    /// When a stop is in progress the final transition belongs to
    /// `stop_locked`; the monitor only settles self-terminated runs.
    async fn monitor(
        worker_join: JoinHandle<Result<(), WorkerError>>,
        cancel: CancellationToken,
        publisher: Publisher<M>,
        state: Arc<watch::Sender<RunState>>,
        bus: Bus,
        name: Arc<str>,
    ) {
        let verdict = match worker_join.await {
            Ok(Ok(())) => Verdict::Clean,
            Ok(Err(err)) if err.is_graceful() => Verdict::Clean,
            Ok(Err(err)) => Verdict::Failed(err.to_string()),
            Err(join_err) if join_err.is_cancelled() => Verdict::Clean,
            Err(join_err) => Verdict::Failed(format!("worker panicked: {join_err}")),
        };

        if cancel.is_cancelled() {
            return;
        }

        match verdict {
            Verdict::Clean => {
                publisher.close_generation();
                state.send_replace(RunState::Stopped);
                bus.publish(Event::new(EventKind::ServiceStopped).with_service(name));
            }
            Verdict::Failed(reason) => {
                state.send_replace(RunState::Crashed);
                bus.publish(
                    Event::new(EventKind::ServiceCrashed)
                        .with_service(name)
                        .with_reason(reason),
                );
            }
        }
    }
}
