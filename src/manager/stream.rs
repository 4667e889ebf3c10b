//! Lazy, restartable message stream over a broker cursor.
//!
//! A [`MessageStream`] is what
//! [`ServiceManager::stream`](crate::ServiceManager::stream) returns: an
//! infinite sequence of service messages that ends on producer silence
//! (when an idle bound was given), on service stop/restart, or when the
//! caller drops it. It is restartable by calling `stream` again — each
//! call attaches a fresh cursor at the current tail.

use std::time::Duration;

use crate::broker::{Cursor, Recv};

/// Why a [`MessageStream`] finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The idle bound elapsed with no message. Not an error: callers use
    /// this to decide whether silence is actionable (trigger recovery).
    Idle,
    /// The service stopped or restarted; this cursor's generation closed.
    Closed,
}

/// Read-only view of one service's message sequence.
pub struct MessageStream<M> {
    cursor: Cursor<M>,
    idle: Option<Duration>,
    end: Option<StreamEnd>,
}

impl<M: Clone + Send + 'static> MessageStream<M> {
    pub(crate) fn new(cursor: Cursor<M>, idle: Option<Duration>) -> Self {
        Self {
            cursor,
            idle,
            end: None,
        }
    }

    /// Receives the next message, or `None` once the stream has ended.
    ///
    /// After `None`, [`end`](MessageStream::end) reports whether the
    /// sequence finished on idle-silence or on close; further calls keep
    /// returning `None`.
    pub async fn next(&mut self) -> Option<M> {
        if self.end.is_some() {
            return None;
        }
        match self.cursor.recv(self.idle).await {
            Recv::Msg(msg) => Some(msg),
            Recv::Idle => {
                self.end = Some(StreamEnd::Idle);
                None
            }
            Recv::Closed => {
                self.end = Some(StreamEnd::Closed);
                None
            }
        }
    }

    /// Returns why the stream ended, or `None` while it is still live.
    pub fn end(&self) -> Option<StreamEnd> {
        self.end
    }
}
