//! Lifecycle event observer trait.
//!
//! Provides [`Observe`], the extension point for plugging custom event
//! handlers (logging, metrics, alerting) into the runtime.
//!
//! Observers are attached via
//! [`ServiceManager::attach`](crate::ServiceManager::attach); each one
//! runs on its own forwarding task, so a slow observer only lags behind
//! on its own receiver and never blocks publishers or other observers.

use async_trait::async_trait;

use crate::events::Event;

/// Event observer for runtime observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Events are delivered in publication order per observer; an observer
///   that lags behind the bus capacity skips the oldest events.
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated forwarding task, not in the publisher
    /// context.
    async fn on_event(&self, event: &Event);

    /// Returns the observer name used in logs.
    ///
    /// Prefer short, descriptive names (e.g., "log", "metrics").
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
