use crate::feed::MessageId;
use std::collections::{HashSet, VecDeque};

/// Size at which the set is trimmed.
pub const SEEN_CEILING: usize = 200;
/// Ids kept after a trim (the most recently inserted).
pub const SEEN_RETAIN: usize = 100;

/// Bounded record of processed message ids.
///
/// Eviction is by insertion order, not by last access: an id older than the retained window can
/// be processed again if the feed re-delivers it.
#[derive(Debug, Default)]
pub struct SeenSet {
    order: VecDeque<MessageId>,
    ids: HashSet<MessageId>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    /// Record `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: MessageId) -> bool {
        if !self.ids.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > SEEN_CEILING {
            while self.order.len() > SEEN_RETAIN {
                if let Some(old) = self.order.pop_front() {
                    self.ids.remove(&old);
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_duplicates() {
        let mut seen = SeenSet::new();
        assert!(seen.insert(MessageId::from(1u64)));
        assert!(!seen.insert(MessageId::from("1")));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn never_exceeds_ceiling_and_keeps_latest() {
        let mut seen = SeenSet::new();
        for i in 0..250u64 {
            seen.insert(MessageId::from(i));
            assert!(seen.len() <= SEEN_CEILING);
        }
        // Trimmed to 100 at insert 201, then 49 more.
        assert_eq!(seen.len(), 149);
        assert!(seen.contains(&MessageId::from(249u64)));
        assert!(seen.contains(&MessageId::from(101u64)));
        assert!(!seen.contains(&MessageId::from(100u64)));
        assert!(!seen.contains(&MessageId::from(0u64)));
    }

    #[test]
    fn evicted_ids_are_fresh_again() {
        let mut seen = SeenSet::new();
        for i in 0..=SEEN_CEILING as u64 {
            seen.insert(MessageId::from(i));
        }
        assert!(seen.insert(MessageId::from(0u64)));
    }
}
