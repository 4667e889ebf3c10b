//! Observer extension point for lifecycle events.

mod log;
mod observe;

pub use log::LogObserver;
pub use observe::Observe;
