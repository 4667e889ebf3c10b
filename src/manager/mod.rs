//! Registry of named services and the access primitives built on it.

mod borrow;
#[allow(clippy::module_inception)]
mod manager;
mod stream;

pub use borrow::Borrowed;
pub use manager::ServiceManager;
pub use stream::{MessageStream, StreamEnd};
