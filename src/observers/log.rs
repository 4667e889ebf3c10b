//! Logging observer built on `tracing`.
//!
//! [`LogObserver`] emits one structured log record per lifecycle event.
//! Crash and abort conditions log at `warn`, routine transitions at
//! `info`/`debug`.

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::observe::Observe;

/// Structured logging observer.
///
/// Attach it to a manager to get a log line for every lifecycle event:
///
/// ```no_run
/// # use servisor::{Config, LogObserver, ServiceManager};
/// # use std::sync::Arc;
/// # #[tokio::main] async fn main() {
/// let manager: Arc<ServiceManager<String>> = ServiceManager::new(Config::default());
/// manager.attach(Arc::new(LogObserver));
/// # }
/// ```
pub struct LogObserver;

#[async_trait]
impl Observe for LogObserver {
    async fn on_event(&self, event: &Event) {
        let service = event.service.as_deref().unwrap_or("-");
        match event.kind {
            EventKind::ServiceRegistered => {
                tracing::info!(service, "service registered");
            }
            EventKind::ServiceStarting => {
                tracing::info!(service, "service starting");
            }
            EventKind::ServiceReady => {
                tracing::info!(service, "service ready");
            }
            EventKind::ServiceStopping => {
                tracing::debug!(service, "service stopping");
            }
            EventKind::ServiceStopped => {
                tracing::info!(service, "service stopped");
            }
            EventKind::ServiceCrashed => {
                let reason = event.reason.as_deref().unwrap_or("unknown");
                tracing::warn!(service, reason, "service crashed");
            }
            EventKind::ServiceRestartRequested => {
                tracing::info!(service, "service restart requested");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(service, "stop grace exceeded, worker aborted");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
