use crate::model::{DateKey, EntriesByDate, Entry};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Flattened, chronologically ordered view of every entry, used to seek the carousel.
///
/// Built once from an [`EntriesByDate`] and never mutated; a changed dataset gets a
/// freshly built index swapped in whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryIndex {
    all: Rc<[Entry]>,
    first_by_key: BTreeMap<DateKey, usize>,
}

impl EntryIndex {
    pub fn build(entries: &EntriesByDate) -> Self {
        let mut all = Vec::with_capacity(entries.total());
        let mut first_by_key = BTreeMap::new();
        for (key, day) in entries.iter() {
            if day.is_empty() {
                continue;
            }
            first_by_key.insert(key.clone(), all.len());
            all.extend(day.iter().cloned());
        }
        EntryIndex {
            all: all.into(),
            first_by_key,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.all
    }

    /// Shared handle to the flattened list, held by an open carousel.
    pub fn shared(&self) -> Rc<[Entry]> {
        Rc::clone(&self.all)
    }

    pub fn first_index(&self, key: &DateKey) -> Option<usize> {
        self.first_by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}
