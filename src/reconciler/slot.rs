//! Latest-state slot for one stream. Slots are created empty, mutated only by
//! the reconciler's flush path, and read as consistent snapshots.

use crate::normalize::block::NormalizedBlock;

/// Consumer-facing view of one stream's latest accepted state.
///
/// `change_counter` increments exactly once per accepted identity change and
/// is never reset; consumers use it as a one-shot notification cue (e.g. an
/// animation key), never as block identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSlot {
    pub current: Option<NormalizedBlock>,
    pub last_accepted_sequence: Option<u64>,
    pub change_counter: u64,
}

impl StreamSlot {
    /// True until the first flush lands, backing the caller-rendered
    /// "waiting" state.
    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let slot = StreamSlot::default();
        assert!(slot.is_empty());
        assert_eq!(slot.last_accepted_sequence, None);
        assert_eq!(slot.change_counter, 0);
    }
}
