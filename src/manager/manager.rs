//! Service registry and the sole entry point for external callers.
//!
//! ## Access paths
//! ```text
//! caller task 1 ──► stream("mqtt")  ──► fresh cursor (many allowed)
//! caller task 2 ──► stream("mqtt")  ──► fresh cursor
//! caller task 3 ──► borrow("mqtt")  ──► exclusive guard (one at a time)
//! caller task 4 ──► borrow("video") ──► independent lock, no contention
//! reload        ──► restart_all(await_ready)
//! ```
//!
//! ## Rules
//! - The registry map is mutated only by `register` (append-only) and
//!   read by every other operation.
//! - The manager never mutates a service's state or broker directly; it
//!   only invokes service operations.
//! - `restart_all` is best-effort and independent per service; one
//!   failure never aborts the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinSet;

use crate::config::Config;
use crate::error::{RestartAllError, SvcError};
use crate::events::{Bus, Event, EventKind};
use crate::observers::Observe;
use crate::service::{Service, ServiceSpec};

use super::borrow::Borrowed;
use super::stream::MessageStream;

/// Registry of named services.
///
/// ## Example
/// ```no_run
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # use servisor::{Config, ServiceManager, ServiceSpec, WorkerRef};
/// # async fn demo(tunnel: WorkerRef<Vec<u8>>) -> Result<(), Box<dyn std::error::Error>> {
/// let manager: Arc<ServiceManager<Vec<u8>>> = ServiceManager::new(Config::default());
///
/// let pppp = manager.register(ServiceSpec::new("pppp", tunnel)).await?;
/// pppp.start().await;
/// pppp.await_ready(Duration::from_secs(5)).await?;
///
/// let mut feed = manager.stream("pppp", Some(Duration::from_secs(3))).await?;
/// while let Some(packet) = feed.next().await {
///     // forward to the connected observer
///     let _ = packet;
/// }
/// # Ok(())
/// # }
/// ```
pub struct ServiceManager<M: Clone + Send + 'static> {
    cfg: Config,
    bus: Bus,
    svcs: RwLock<HashMap<String, Arc<Service<M>>>>,
}

impl<M: Clone + Send + 'static> ServiceManager<M> {
    /// Creates a manager with the given configuration.
    pub fn new(cfg: Config) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Arc::new(Self {
            cfg,
            bus,
            svcs: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the lifecycle event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Attaches an observer on its own forwarding task.
    ///
    /// Must be called from within a tokio runtime. An observer that lags
    /// behind the bus capacity skips the oldest events; it never blocks
    /// publishers or other observers.
    pub fn attach(&self, observer: Arc<dyn Observe>) {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => observer.on_event(&ev).await,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Registers a service under its unique name, leaving it `Stopped`.
    ///
    /// Starting is the caller's decision. Fails with
    /// [`SvcError::AlreadyRegistered`] when the name is taken; the
    /// original registration stays untouched.
    pub async fn register(&self, spec: ServiceSpec<M>) -> Result<Arc<Service<M>>, SvcError> {
        let name = spec.name().to_string();
        let mut svcs = self.svcs.write().await;
        if svcs.contains_key(&name) {
            return Err(SvcError::AlreadyRegistered { name });
        }
        let service = Service::new(spec.into_parts(&self.cfg), self.bus.clone());
        svcs.insert(name.clone(), service.clone());
        drop(svcs);

        self.bus
            .publish(Event::new(EventKind::ServiceRegistered).with_service(name));
        Ok(service)
    }

    /// Returns the service registered under `name`.
    pub async fn get(&self, name: &str) -> Result<Arc<Service<M>>, SvcError> {
        self.svcs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| SvcError::NotFound {
                name: name.to_string(),
            })
    }

    /// Returns the sorted list of registered service names.
    pub async fn list(&self) -> Vec<String> {
        let svcs = self.svcs.read().await;
        let mut names: Vec<String> = svcs.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Acquires scoped, exclusive access to a service's command handle.
    ///
    /// Blocks until no other borrower holds the same service; borrowers
    /// of different services never contend, and stream readers are not
    /// affected. The guard releases on drop, on every exit path.
    pub async fn borrow(&self, name: &str) -> Result<Borrowed<M>, SvcError> {
        let service = self.get(name).await?;
        let permit = service.borrow_lock().lock_owned().await;
        Ok(Borrowed::new(service, permit))
    }

    /// Opens a read-only stream of the service's messages.
    ///
    /// Each call allocates a fresh cursor at the current tail: many
    /// concurrent streams are allowed, and a finished stream is resumed
    /// by simply calling `stream` again. With `idle = Some(d)`, the
    /// sequence ends after `d` of producer silence so the caller can
    /// treat staleness as actionable.
    pub async fn stream(
        &self,
        name: &str,
        idle: Option<Duration>,
    ) -> Result<MessageStream<M>, SvcError> {
        let service = self.get(name).await?;
        Ok(MessageStream::new(service.subscribe().await, idle))
    }

    /// Restarts every registered service, best-effort and concurrently.
    ///
    /// With `await_ready`, waits until each service reports `Running`
    /// within its own readiness bound and returns a
    /// [`RestartAllError`] enumerating exactly the services that failed;
    /// a failure never aborts the restart attempts of the others.
    pub async fn restart_all(&self, await_ready: bool) -> Result<(), RestartAllError> {
        let snapshot: Vec<Arc<Service<M>>> =
            self.svcs.read().await.values().cloned().collect();

        let mut attempts = Vec::with_capacity(snapshot.len());
        for service in snapshot {
            let name = service.name().to_string();
            let handle = tokio::spawn(async move {
                service.restart().await;
                if await_ready {
                    service.await_ready(service.ready_timeout()).await
                } else {
                    Ok(())
                }
            });
            attempts.push((name, handle));
        }

        let mut failures = Vec::new();
        for (name, handle) in attempts {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => failures.push((name, err)),
                // a panicked restart task still counts against its service
                Err(_) => failures.push((name.clone(), SvcError::Crashed { name })),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            failures.sort_by(|(a, _), (b, _)| a.cmp(b));
            Err(RestartAllError { failures })
        }
    }

    /// Stops every registered service, concurrently.
    ///
    /// Used on reconfiguration and process teardown.
    pub async fn stop_all(&self) {
        let snapshot: Vec<Arc<Service<M>>> =
            self.svcs.read().await.values().cloned().collect();

        let mut set = JoinSet::new();
        for service in snapshot {
            set.spawn(async move { service.stop().await });
        }
        while set.join_next().await.is_some() {}
    }
}
