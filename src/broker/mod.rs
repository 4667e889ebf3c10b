//! Per-service fan-out channel: one producer, many independent cursors.

mod channel;
mod cursor;

pub use channel::{Broker, Publisher};
pub use cursor::{Cursor, Recv};
