//! Test workers shared by the integration suites.
#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use servisor::{Event, EventKind, Observe, RunState, Service, Worker, WorkerContext, WorkerError};
use tokio::sync::{Mutex, Notify, mpsc};

/// Installs the env-filtered fmt subscriber once per test binary.
///
/// Lets `LogObserver` output show up under `RUST_LOG=...` without
/// fighting over the global dispatcher across tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Relays injected lines into the service broker.
///
/// `send` doubles as the domain-specific command surface exercised after
/// a borrow. The same worker value survives restarts: each run re-locks
/// the feed receiver.
pub struct RelayWorker {
    feed_tx: mpsc::UnboundedSender<String>,
    feed_rx: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl RelayWorker {
    pub fn new() -> Arc<Self> {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            feed_tx,
            feed_rx: Mutex::new(feed_rx),
        })
    }

    /// Command surface: queue a line for publication.
    pub fn send(&self, msg: &str) {
        let _ = self.feed_tx.send(msg.to_string());
    }
}

#[async_trait]
impl Worker<String> for RelayWorker {
    async fn run(&self, ctx: WorkerContext<String>) -> Result<(), WorkerError> {
        let mut rx = self.feed_rx.lock().await;
        ctx.ready();
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Err(WorkerError::Canceled),
                msg = rx.recv() => match msg {
                    Some(msg) => ctx.publish(msg),
                    None => return Ok(()),
                },
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Fails on demand without ever signaling readiness.
pub struct FailingStartWorker {
    trigger: Notify,
}

impl FailingStartWorker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            trigger: Notify::new(),
        })
    }

    pub fn fail_now(&self) {
        self.trigger.notify_one();
    }
}

#[async_trait]
impl Worker<String> for FailingStartWorker {
    async fn run(&self, ctx: WorkerContext<String>) -> Result<(), WorkerError> {
        tokio::select! {
            _ = ctx.cancelled() => Err(WorkerError::Canceled),
            _ = self.trigger.notified() => Err(WorkerError::fail("refused to come up")),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Panics as soon as it runs.
pub struct PanicWorker;

#[async_trait]
impl Worker<String> for PanicWorker {
    async fn run(&self, _ctx: WorkerContext<String>) -> Result<(), WorkerError> {
        panic!("worker exploded");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Never signals readiness; exits only on cancellation.
pub struct NeverReadyWorker;

#[async_trait]
impl Worker<String> for NeverReadyWorker {
    async fn run(&self, ctx: WorkerContext<String>) -> Result<(), WorkerError> {
        ctx.cancelled().await;
        Err(WorkerError::Canceled)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Becomes ready, then fails on demand.
pub struct CrashWorker {
    trigger: Notify,
}

impl CrashWorker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            trigger: Notify::new(),
        })
    }

    pub fn crash(&self) {
        self.trigger.notify_one();
    }
}

#[async_trait]
impl Worker<String> for CrashWorker {
    async fn run(&self, ctx: WorkerContext<String>) -> Result<(), WorkerError> {
        ctx.ready();
        tokio::select! {
            _ = ctx.cancelled() => Err(WorkerError::Canceled),
            _ = self.trigger.notified() => Err(WorkerError::fail("link lost")),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Collects event kinds in delivery order for lifecycle assertions.
#[derive(Default)]
pub struct RecordingObserver {
    seen: std::sync::Mutex<Vec<EventKind>>,
}

impl RecordingObserver {
    pub fn kinds(&self) -> Vec<EventKind> {
        self.seen.lock().expect("observer lock poisoned").clone()
    }
}

#[async_trait]
impl Observe for RecordingObserver {
    async fn on_event(&self, event: &Event) {
        self.seen
            .lock()
            .expect("observer lock poisoned")
            .push(event.kind);
    }
}

/// Waits until the service reports `want`, with a 2s safety bound.
pub async fn wait_state<M: Clone + Send + 'static>(service: &Service<M>, want: RunState) {
    let mut rx = service.watch();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if *rx.borrow_and_update() == want {
                return;
            }
            rx.changed().await.expect("state watch closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("service did not reach {want:?} in time"));
}
