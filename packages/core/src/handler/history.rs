//! Bounded, append-only error history.
//!
//! Entries are only ever appended. Once the configured capacity is reached
//! the oldest entry is evicted before the new one is inserted (ring-buffer
//! semantics backed by `VecDeque`), which keeps long-lived sessions from
//! growing without limit. [`ErrorHistory::total_recorded`] keeps counting
//! past the bound.

use std::collections::VecDeque;

use super::types::AppError;

#[derive(Debug)]
pub struct ErrorHistory {
    entries: VecDeque<AppError>,
    capacity: usize,
    total_recorded: u64,
}

impl ErrorHistory {
    /// Create a history holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            total_recorded: 0,
        }
    }

    pub fn push(&mut self, error: AppError) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(error);
        self.total_recorded += 1;
    }

    /// Snapshot of the retained entries, oldest first.
    pub fn snapshot(&self) -> Vec<AppError> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&AppError> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of errors ever appended, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::classify::{classify, RawError};

    fn make_error(message: &str) -> AppError {
        classify(&RawError::from(message))
    }

    #[test]
    fn push_appends_in_order() {
        let mut history = ErrorHistory::new(10);
        history.push(make_error("first"));
        history.push(make_error("second"));

        let all = history.snapshot();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message(), "first");
        assert_eq!(history.latest().unwrap().message(), "second");
    }

    #[test]
    fn push_evicts_oldest_when_at_capacity() {
        let mut history = ErrorHistory::new(3);
        for message in ["a", "b", "c", "d"] {
            history.push(make_error(message));
        }

        assert_eq!(history.len(), 3);
        let all = history.snapshot();
        assert_eq!(all[0].message(), "b");
        assert_eq!(all[2].message(), "d");
        assert_eq!(history.total_recorded(), 4);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut history = ErrorHistory::new(0);
        history.push(make_error("only"));
        history.push(make_error("newest"));

        assert_eq!(history.capacity(), 1);
        assert_eq!(history.snapshot()[0].message(), "newest");
    }

    #[test]
    fn new_history_is_empty() {
        let history = ErrorHistory::new(5);
        assert!(history.is_empty());
        assert!(history.latest().is_none());
        assert_eq!(history.total_recorded(), 0);
    }
}
