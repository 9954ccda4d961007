//! Live search results bound to chat messages, and their persistence.

mod persist;
mod pool;
mod registry;

pub use persist::{restore, snapshot};
pub use pool::{PoolControl, TrackPool, INERT_PAYLOAD, PAGE_SIZE};
pub use registry::{ButtonBinding, SessionRegistry};
