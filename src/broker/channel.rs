//! Fan-out message broker with generational close.
//!
//! [`Broker`] decouples one producer (the service worker) from N
//! independent consumers with bounded memory:
//!
//! ```text
//! Publisher ──► [bounded ring buffer] ──► Cursor 1
//!                                     ├─► Cursor 2
//!                                     └─► Cursor N
//! ```
//!
//! ## Rules
//! - **Drop-oldest**: at capacity, the oldest retained message is evicted;
//!   cursors that have not read it yet skip it. Consumers are best-effort
//!   observational views, not exactly-once sinks.
//! - **Subscribe at tail**: a new cursor sees no history, only messages
//!   published after it subscribed.
//! - **Production order**: every cursor observes the surviving subset in
//!   the order the producer published it.
//! - **Generational**: each `open()` installs a fresh channel and close
//!   token. Closing a generation releases every blocked reader; cursors
//!   on an old generation observe end-of-sequence.
//!
//! The broker starts closed; the owning service opens it on `start()` and
//! closes it on `stop()`/`restart()`, so a stream on a stopped service
//! ends immediately instead of hanging.

use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;

use super::cursor::Cursor;

/// One generation of the fan-out channel.
struct Generation<M> {
    tx: broadcast::Sender<M>,
    closed: CancellationToken,
}

impl<M: Clone + Send + 'static> Generation<M> {
    fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            closed: CancellationToken::new(),
        }
    }
}

/// Bounded fan-out channel owned by a [`Service`](crate::Service).
///
/// The service is the only writer of generations; consumers only ever
/// take a snapshot of the current one, so cursors keep working (until
/// closed) even while the broker is being reset.
pub struct Broker<M> {
    capacity: usize,
    current: RwLock<Generation<M>>,
}

impl<M: Clone + Send + 'static> Broker<M> {
    /// Creates a broker with the given buffer capacity (min 1, clamped).
    ///
    /// The initial generation is closed: nothing is producing yet.
    pub(crate) fn new(capacity: usize) -> Self {
        let generation = Generation::new(capacity);
        generation.closed.cancel();
        Self {
            capacity: capacity.max(1),
            current: RwLock::new(generation),
        }
    }

    /// Installs a fresh open generation and returns its publisher.
    ///
    /// The previous generation is closed first, so cursors subscribed to
    /// it observe end-of-sequence.
    pub(crate) async fn open(&self) -> Publisher<M> {
        let mut current = self.current.write().await;
        current.closed.cancel();
        *current = Generation::new(self.capacity);
        Publisher {
            tx: current.tx.clone(),
            closed: current.closed.clone(),
        }
    }

    /// Closes the current generation, releasing every blocked reader.
    ///
    /// Idempotent; publishing into a closed generation is a no-op.
    pub(crate) async fn close(&self) {
        self.current.read().await.closed.cancel();
    }

    /// Creates a cursor starting at the tail of the current generation.
    pub(crate) async fn subscribe(&self) -> Cursor<M> {
        let current = self.current.read().await;
        Cursor::new(current.tx.subscribe(), current.closed.clone())
    }
}

/// Producer handle for one broker generation.
///
/// Handed to workers through [`WorkerContext`](crate::WorkerContext).
/// Cheap to clone; all clones feed the same generation.
pub struct Publisher<M> {
    tx: broadcast::Sender<M>,
    closed: CancellationToken,
}

impl<M: Clone + Send + 'static> Publisher<M> {
    /// Publishes a message to all live cursors of this generation.
    ///
    /// Never blocks. Dropped silently when the generation is closed or
    /// no cursor is subscribed.
    pub fn publish(&self, msg: M) {
        if !self.closed.is_cancelled() {
            let _ = self.tx.send(msg);
        }
    }

    /// Returns `true` once the generation has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Closes this generation, releasing blocked readers.
    ///
    /// Used by the service monitor when a worker exits on its own.
    pub(crate) fn close_generation(&self) {
        self.closed.cancel();
    }
}

impl<M> Clone for Publisher<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            closed: self.closed.clone(),
        }
    }
}
