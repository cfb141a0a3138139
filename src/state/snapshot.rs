/// Cached collection with its two-phase load flags
use serde::Serialize;

/// Where a collection sits in its progressive load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Empty,
    InitialLoaded,
    FullyLoaded,
}

/// Ordered items plus `initial_loaded` / `fully_loaded` flags
///
/// Items are always replaced wholesale, never merged. Flags only move
/// forward until `reset`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot<T> {
    items: Vec<T>,
    initial_loaded: bool,
    fully_loaded: bool,
}

impl<T> Default for CollectionSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            initial_loaded: false,
            fully_loaded: false,
        }
    }
}

impl<T: Clone> CollectionSnapshot<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn phase(&self) -> LoadPhase {
        if self.fully_loaded {
            LoadPhase::FullyLoaded
        } else if self.initial_loaded {
            LoadPhase::InitialLoaded
        } else {
            LoadPhase::Empty
        }
    }

    /// Cached items if the initial page landed and is non-empty
    pub fn cached(&self) -> Option<Vec<T>> {
        if self.initial_loaded && !self.items.is_empty() {
            Some(self.items.clone())
        } else {
            None
        }
    }

    /// Store the first fast page
    pub fn set_initial(&mut self, items: Vec<T>) {
        self.items = items;
        self.initial_loaded = true;
    }

    /// Store the complete collection
    pub fn set_full(&mut self, items: Vec<T>) {
        self.items = items;
        self.initial_loaded = true;
        self.fully_loaded = true;
    }

    /// Mark the collection settled without touching its items
    pub fn mark_settled(&mut self) {
        self.initial_loaded = true;
        self.fully_loaded = true;
    }

    /// Back to empty, clearing both flags
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_move_forward() {
        let mut snapshot = CollectionSnapshot::default();
        assert_eq!(snapshot.phase(), LoadPhase::Empty);
        assert_eq!(snapshot.cached(), None);

        snapshot.set_initial(vec![1, 2]);
        assert_eq!(snapshot.phase(), LoadPhase::InitialLoaded);
        assert_eq!(snapshot.cached(), Some(vec![1, 2]));

        snapshot.set_full(vec![1, 2, 3]);
        assert_eq!(snapshot.phase(), LoadPhase::FullyLoaded);

        // A forced reload replaces items but does not regress the phase
        snapshot.set_initial(vec![9]);
        assert_eq!(snapshot.phase(), LoadPhase::FullyLoaded);
        assert_eq!(snapshot.cached(), Some(vec![9]));
    }

    #[test]
    fn test_empty_initial_page_is_not_served_from_cache() {
        let mut snapshot: CollectionSnapshot<u8> = CollectionSnapshot::default();
        snapshot.set_initial(Vec::new());
        assert_eq!(snapshot.phase(), LoadPhase::InitialLoaded);
        assert_eq!(snapshot.cached(), None);
    }

    #[test]
    fn test_mark_settled_keeps_items() {
        let mut snapshot = CollectionSnapshot::default();
        snapshot.set_initial(vec!["a"]);
        snapshot.mark_settled();
        assert_eq!(snapshot.cached(), Some(vec!["a"]));
        assert_eq!(snapshot.phase(), LoadPhase::FullyLoaded);

        snapshot.reset();
        assert_eq!(snapshot.phase(), LoadPhase::Empty);
        assert!(snapshot.is_empty());
    }
}
