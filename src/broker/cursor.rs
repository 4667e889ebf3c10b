//! Consumer cursor into a broker generation.
//!
//! A [`Cursor`] is an independent read position into the producer's
//! logical append-only sequence. Receiving never advances any other
//! cursor; a cursor that stops reading cannot slow another one down.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Outcome of a single [`Cursor::recv`] call.
#[derive(Debug)]
pub enum Recv<M> {
    /// A message was received; the cursor advanced past it.
    Msg(M),
    /// The idle bound elapsed with no message. Observable condition,
    /// not an error; the cursor stays usable.
    Idle,
    /// The generation was closed (service stopped or restarted).
    Closed,
}

/// Independent read cursor into one broker generation.
///
/// Dropping the cursor releases its buffer slot deterministically.
pub struct Cursor<M> {
    rx: broadcast::Receiver<M>,
    closed: CancellationToken,
}

impl<M: Clone + Send + 'static> Cursor<M> {
    pub(crate) fn new(rx: broadcast::Receiver<M>, closed: CancellationToken) -> Self {
        Self { rx, closed }
    }

    /// Waits for the next message past this cursor.
    ///
    /// - `idle = Some(d)`: returns [`Recv::Idle`] after `d` of producer
    ///   silence.
    /// - `idle = None`: waits until a message arrives or the generation
    ///   closes.
    ///
    /// A cursor that fell behind the buffer skips to the oldest retained
    /// message transparently; order is preserved for what survives.
    /// Messages already buffered are drained before [`Recv::Closed`] is
    /// reported.
    pub async fn recv(&mut self, idle: Option<Duration>) -> Recv<M> {
        let deadline = idle.map(|d| Instant::now() + d);
        loop {
            tokio::select! {
                biased;
                res = self.rx.recv() => match res {
                    Ok(msg) => return Recv::Msg(msg),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return Recv::Closed,
                },
                _ = self.closed.cancelled() => return Recv::Closed,
                _ = idle_wait(deadline) => return Recv::Idle,
            }
        }
    }
}

async fn idle_wait(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
