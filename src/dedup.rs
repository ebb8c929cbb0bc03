use crate::task::TaskIndex;
use std::collections::HashSet;

/// Per-lifetime record of which tasks are being handled and which are done.
///
/// Nothing here survives a restart: a fresh process starts with both sets
/// empty, so the only guarantee is "no redundant recomputation within one
/// lifetime", not exactly-once delivery.
#[derive(Debug, Default)]
pub struct TaskDeduplicator {
    in_flight: HashSet<TaskIndex>,
    processed: HashSet<TaskIndex>,
}

impl TaskDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the task is already in flight or already completed.
    /// Otherwise marks it in flight and returns `true`.
    pub fn admit(&mut self, index: TaskIndex) -> bool {
        if self.processed.contains(&index) {
            return false;
        }
        self.in_flight.insert(index)
    }

    /// Success path: in flight -> processed.
    pub fn commit(&mut self, index: TaskIndex) {
        if !self.in_flight.remove(&index) {
            tracing::debug!("[TASK] commit for task {} that was not in flight", index);
        }
        self.processed.insert(index);
    }

    /// Failure path: forget the attempt so a later observation can retry.
    pub fn rollback(&mut self, index: TaskIndex) {
        self.in_flight.remove(&index);
    }

    /// Drops every in-flight entry without marking it processed. Returns how
    /// many were released.
    pub fn release_in_flight(&mut self) -> usize {
        let released = self.in_flight.len();
        self.in_flight.clear();
        released
    }

    pub fn is_in_flight(&self, index: TaskIndex) -> bool {
        self.in_flight.contains(&index)
    }

    pub fn is_processed(&self, index: TaskIndex) -> bool {
        self.processed.contains(&index)
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::TaskDeduplicator;
    use crate::task::TaskIndex;

    #[test]
    fn test_admit_rejects_second_concurrent_attempt() {
        let mut dedup = TaskDeduplicator::new();
        assert!(dedup.admit(TaskIndex(7)));
        assert!(!dedup.admit(TaskIndex(7)));
        assert!(dedup.admit(TaskIndex(8)));
        assert_eq!(dedup.in_flight_len(), 2);
    }

    #[test]
    fn test_commit_blocks_readmission() {
        let mut dedup = TaskDeduplicator::new();
        assert!(dedup.admit(TaskIndex(1)));
        dedup.commit(TaskIndex(1));
        assert!(dedup.is_processed(TaskIndex(1)));
        assert!(!dedup.is_in_flight(TaskIndex(1)));
        assert!(!dedup.admit(TaskIndex(1)));
    }

    #[test]
    fn test_rollback_allows_retry() {
        let mut dedup = TaskDeduplicator::new();
        assert!(dedup.admit(TaskIndex(42)));
        dedup.rollback(TaskIndex(42));
        assert!(!dedup.is_in_flight(TaskIndex(42)));
        assert!(!dedup.is_processed(TaskIndex(42)));
        assert!(dedup.admit(TaskIndex(42)));
    }

    #[test]
    fn test_rollback_of_unknown_task_is_noop() {
        let mut dedup = TaskDeduplicator::new();
        dedup.rollback(TaskIndex(3));
        assert_eq!(dedup.in_flight_len(), 0);
        assert_eq!(dedup.processed_len(), 0);
    }

    #[test]
    fn test_release_in_flight_keeps_processed() {
        let mut dedup = TaskDeduplicator::new();
        assert!(dedup.admit(TaskIndex(1)));
        dedup.commit(TaskIndex(1));
        assert!(dedup.admit(TaskIndex(2)));
        assert_eq!(dedup.release_in_flight(), 1);
        assert!(dedup.admit(TaskIndex(2)));
        assert!(!dedup.admit(TaskIndex(1)));
    }
}
