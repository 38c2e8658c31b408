//! In-memory progress pub/sub and task lifecycle registry (spec §4.2 "Progress
//! Bus", §4.3 "Task Registry"). No durable backing store: both are rebuilt
//! from scratch on process restart, per the "no durable task store"
//! Non-goal.

mod progress;
mod registry;

pub use progress::{ProgressBus, DEFAULT_CAPACITY};
pub use registry::{TaskRegistry, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
