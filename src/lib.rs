//! # servisor
//!
//! **Servisor** supervises a device's communication channels as named,
//! independently running background services, and multiplexes each one to
//! many concurrent front-end consumers.
//!
//! It provides three primitives:
//! - many simultaneous **read-only streams** of a service's output,
//! - short, mutually exclusive **borrows** for issuing commands,
//! - coordinated **restart** when an underlying connection degrades.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                ┌────────────────────────────────────────────────┐
//!                │  ServiceManager (registry, sole entry point)   │
//!                │  register / get / borrow / stream / restart_all│
//!                └───────┬──────────────┬──────────────┬──────────┘
//!                        ▼              ▼              ▼
//!                 ┌────────────┐ ┌────────────┐ ┌────────────┐
//!                 │  Service   │ │  Service   │ │  Service   │
//!                 │  "pppp"    │ │ "mqttqueue"│ │"videoqueue"│
//!                 └─┬────────┬─┘ └────────────┘ └────────────┘
//!             state machine  │
//!   Stopped/Starting/Running │ owns
//!     Stopping/Crashed       ▼
//!                 ┌─────────────────────┐      ┌──────────────────┐
//!                 │  Worker (one task)  │─────►│ Broker (fan-out) │
//!                 │  device I/O loop    │ pub  │ bounded, drop-   │
//!                 └─────────────────────┘      │ oldest, N cursors│
//!                                              └──┬─────┬─────┬───┘
//!                                                 ▼     ▼     ▼
//!                                           stream 1  ...  stream N
//!                                          (one per connected client)
//! ```
//!
//! ### Lifecycle
//! ```text
//! ServiceSpec ──► ServiceManager::register ──► Service (Stopped)
//!
//! start() ──► Starting ──► worker signals ready ──► Running
//! stop()  ──► Stopping ──► broker closed, worker joined ──► Stopped
//! worker dies ──► Crashed (distinct from Stopped; start() recovers)
//! ```
//!
//! Lifecycle transitions are published as [`Event`]s on a broadcast
//! [`Bus`]; plug in [`Observe`] implementors (e.g. [`LogObserver`]) for
//! logging or metrics.
//!
//! ## Recovery is caller policy
//! The core never retries internally. A caller that sees only silence on
//! a stream (its idle bound elapsed) decides whether that silence is
//! actionable — typically [`Service::ensure_running`] first, then a full
//! [`Service::restart`] if readiness is not reached:
//!
//! ```no_run
//! # use std::time::Duration;
//! # use servisor::{ServiceManager, SvcError};
//! # async fn recover(manager: &ServiceManager<Vec<u8>>) -> Result<(), SvcError> {
//! let mut feed = manager.stream("pppp", Some(Duration::from_secs(3))).await?;
//! while let Some(packet) = feed.next().await {
//!     let _ = packet;
//! }
//! // silence: the tunnel normally sends keep-alives every second
//! let pppp = manager.get("pppp").await?;
//! if pppp.ensure_running().await.is_err() {
//!     pppp.restart().await;
//! }
//! # Ok(())
//! # }
//! ```

mod broker;
mod config;
mod error;
mod events;
mod manager;
mod observers;
mod service;

pub use broker::{Cursor, Publisher, Recv};
pub use config::Config;
pub use error::{RestartAllError, SvcError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use manager::{Borrowed, MessageStream, ServiceManager, StreamEnd};
pub use observers::{LogObserver, Observe};
pub use service::{RunState, Service, ServiceSpec, Worker, WorkerContext, WorkerRef};
