use serde::{Deserialize, Serialize};

/// Dispatch priority among Pending tasks.
///
/// Only used as a sort key: a running task is never preempted by a
/// higher-priority arrival.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    /// Used for short preview tasks so they jump ahead of batch work.
    High,
    Critical,
}
