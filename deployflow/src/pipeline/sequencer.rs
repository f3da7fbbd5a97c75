//! Run-order allocation.

use std::collections::BTreeMap;

/// Allocates run-order values per stage.
///
/// Each call to [`next`](Self::next) returns a value strictly greater than
/// anything already allocated in that stage, starting at 1. Actions that may
/// run side by side ask for [`parallel`](Self::parallel) instead, which
/// reuses the last allocated value. Nothing is inferred: an action that
/// consumes another's output must ask for a fresh value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOrderSequencer {
    allocated: BTreeMap<String, u32>,
}

impl RunOrderSequencer {
    /// Creates a sequencer with nothing allocated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next sequential run-order in `stage`.
    pub fn next(&mut self, stage: &str) -> u32 {
        let next = self.allocated.get(stage).map_or(1, |last| last.saturating_add(1));
        self.allocated.insert(stage.to_string(), next);
        next
    }

    /// Returns the last allocated run-order so an action can share it,
    /// allocating the first one if the stage has none yet.
    pub fn parallel(&mut self, stage: &str) -> u32 {
        match self.allocated.get(stage) {
            Some(&last) => last,
            None => self.next(stage),
        }
    }

    /// Returns the highest run-order allocated in `stage`.
    #[must_use]
    pub fn last(&self, stage: &str) -> Option<u32> {
        self.allocated.get(stage).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_starts_at_one_and_increases() {
        let mut seq = RunOrderSequencer::new();
        assert_eq!(seq.last("Validate"), None);
        assert_eq!(seq.next("Validate"), 1);
        assert_eq!(seq.next("Validate"), 2);
        assert_eq!(seq.next("Validate"), 3);
        assert_eq!(seq.last("Validate"), Some(3));
    }

    #[test]
    fn test_stages_are_independent() {
        let mut seq = RunOrderSequencer::new();
        seq.next("Build");
        seq.next("Build");
        assert_eq!(seq.next("Validate"), 1);
        assert_eq!(seq.next("Build"), 3);
    }

    #[test]
    fn test_parallel_shares_the_last_value() {
        let mut seq = RunOrderSequencer::new();
        assert_eq!(seq.parallel("Build"), 1);
        assert_eq!(seq.parallel("Build"), 1);
        assert_eq!(seq.next("Build"), 2);
        assert_eq!(seq.parallel("Build"), 2);
    }
}
