//! Domain identifiers (strongly-typed IDs).
//!
//! ULID ベースの ID を Phantom type でラップしています。
//! - 時刻でソート可能（生成順）
//! - 調整なしで生成可能
//! - `Id<T>` のマーカー型で他の ID 型と混同できない

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait that supplies the display prefix of an ID type.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic ULID identifier, tagged with a zero-sized marker type.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Identifier of a queued task. Assigned by the queue, never by the caller.
pub type TaskId = Id<Task>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_task_prefix() {
        let ulid = Ulid::new();
        let id = TaskId::from_ulid(ulid);
        assert_eq!(id.as_ulid(), ulid);
        assert_eq!(id.to_string(), format!("task-{ulid}"));
    }

    #[test]
    fn serializes_as_bare_ulid() {
        let id = TaskId::from_ulid(Ulid::new());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));

        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        assert_eq!(std::mem::size_of::<TaskId>(), std::mem::size_of::<Ulid>());
    }
}
