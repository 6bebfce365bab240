//! Per-stream identity tracking. A candidate whose sequence differs from the
//! last classified one (in either direction; a decrease is a valid reorg
//! event) is `New`; an exact match is `Repeat`.

use std::sync::{Mutex, PoisonError};

/// Outcome of classifying a normalized candidate against the stream's last
/// accepted sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    New,
    Repeat,
}

/// Holds the last classified sequence for one stream. Classification and
/// recording happen under a single lock so two candidates can never both
/// observe `New` for the same sequence.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    last_sequence: Mutex<Option<u64>>,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `sequence` and records it as the new reference in the same
    /// uninterrupted step.
    pub fn classify(&self, sequence: u64) -> Classification {
        let mut last = self
            .last_sequence
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let classification = if *last == Some(sequence) {
            Classification::Repeat
        } else {
            Classification::New
        };
        *last = Some(sequence);
        classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_candidate_is_new() {
        let tracker = IdentityTracker::new();
        assert_eq!(tracker.classify(100), Classification::New);
    }

    #[test]
    fn exact_match_is_repeat() {
        let tracker = IdentityTracker::new();
        tracker.classify(100);
        assert_eq!(tracker.classify(100), Classification::Repeat);
        assert_eq!(tracker.classify(100), Classification::Repeat);
    }

    #[test]
    fn any_difference_is_new_including_decreases() {
        let tracker = IdentityTracker::new();
        tracker.classify(100);
        assert_eq!(tracker.classify(101), Classification::New);
        assert_eq!(tracker.classify(99), Classification::New);
        assert_eq!(tracker.classify(99), Classification::Repeat);
    }
}
