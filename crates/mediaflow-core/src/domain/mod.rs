//! Domain model (IDs, task records, lifecycle states, events).

pub mod batch;
pub mod counts;
pub mod events;
pub mod ids;
pub mod priority;
pub mod status;
pub mod task;

pub use batch::{BatchFailure, BatchSummary};
pub use counts::QueueCounts;
pub use events::{EventKind, PROGRESS_SCALE, QueueEvent};
pub use ids::TaskId;
pub use priority::Priority;
pub use status::TaskStatus;
pub use task::{Payload, TaskRecord, TaskSpec};
