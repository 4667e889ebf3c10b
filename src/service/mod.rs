//! Service lifecycle: state machine, worker trait, supervised unit.

mod spec;
mod state;
#[allow(clippy::module_inception)]
mod service;
mod worker;

pub use spec::ServiceSpec;
pub use state::RunState;
pub use service::Service;
pub use worker::{Worker, WorkerContext, WorkerRef};
