//! Pending set ordered by priority, then submission order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::domain::{Priority, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingEntry {
    priority: Priority,
    seq: u64,
    task_id: TaskId,
}

impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then the earlier submission.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending task ids, popped highest-priority first (stable within a priority).
#[derive(Debug, Default)]
pub(crate) struct PendingSet {
    heap: BinaryHeap<PendingEntry>,
    next_seq: u64,
}

impl PendingSet {
    pub(crate) fn push(&mut self, task_id: TaskId, priority: Priority) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(PendingEntry {
            priority,
            seq,
            task_id,
        });
    }

    pub(crate) fn pop(&mut self) -> Option<TaskId> {
        self.heap.pop().map(|entry| entry.task_id)
    }

    /// Remove `task_id`; returns whether it was present.
    pub(crate) fn remove(&mut self, task_id: TaskId) -> bool {
        let before = self.heap.len();
        self.heap.retain(|entry| entry.task_id != task_id);
        self.heap.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn id() -> TaskId {
        TaskId::from_ulid(Ulid::new())
    }

    #[test]
    fn pops_by_priority_then_submission_order() {
        let mut set = PendingSet::default();
        let (n1, n2, low, high, crit, n3) = (id(), id(), id(), id(), id(), id());
        set.push(n1, Priority::Normal);
        set.push(n2, Priority::Normal);
        set.push(low, Priority::Low);
        set.push(high, Priority::High);
        set.push(crit, Priority::Critical);
        set.push(n3, Priority::Normal);

        let order: Vec<TaskId> = std::iter::from_fn(|| set.pop()).collect();
        assert_eq!(order, vec![crit, high, n1, n2, n3, low]);
    }

    #[test]
    fn remove_drops_only_the_target() {
        let mut set = PendingSet::default();
        let (a, b) = (id(), id());
        set.push(a, Priority::Normal);
        set.push(b, Priority::Normal);

        assert!(set.remove(a));
        assert!(!set.remove(a));
        assert_eq!(set.len(), 1);
        assert_eq!(set.pop(), Some(b));
        assert!(set.is_empty());
    }
}
