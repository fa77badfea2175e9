//! Case-insensitive event name index (spec §4.1).
//!
//! Names are stored verbatim in the event record but looked up and inserted
//! by an ASCII-folded key; non-ASCII bytes compare as-is, matching the spec's
//! "folds each byte to lower-case per ASCII only" rule.

use std::collections::HashMap;
use std::rc::Rc;

use crate::event::EventRecord;

/// An ASCII-case-folded event name, cheap to clone since it's reference
/// counted — [`crate::event::Event`] handles carry one of these around.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct FoldedKey(Rc<[u8]>);

impl FoldedKey {
    pub(crate) fn fold(name: &str) -> Self {
        Self(name.bytes().map(|b| b.to_ascii_lowercase()).collect())
    }
}

/// Maps folded event names to the event record owning their bindings.
pub(crate) struct NameIndex<S> {
    events: HashMap<FoldedKey, EventRecord<S>>,
}

pub(crate) enum Insert {
    Inserted,
    AlreadyPresent,
}

impl<S> NameIndex<S> {
    pub(crate) fn new() -> Self {
        Self {
            events: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, key: &FoldedKey) -> Option<&EventRecord<S>> {
        self.events.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &FoldedKey) -> Option<&mut EventRecord<S>> {
        self.events.get_mut(key)
    }

    pub(crate) fn put_if_absent(&mut self, key: FoldedKey, record: EventRecord<S>) -> Insert {
        match self.events.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => Insert::AlreadyPresent,
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(record);
                Insert::Inserted
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }

    /// Number of declared events, for balancing the allocation probe on
    /// destroy.
    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    /// Total bindings across every declared event, for balancing the
    /// allocation probe on destroy.
    pub(crate) fn total_bindings(&self) -> usize {
        self.events.values().map(|r| r.bindings().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_ascii_case_insensitive() {
        let mut idx: NameIndex<()> = NameIndex::new();
        let key = FoldedKey::fold("Frobnicate");
        idx.put_if_absent(key.clone(), EventRecord::new("Frobnicate"));

        assert!(idx.get(&FoldedKey::fold("frobnicate")).is_some());
        assert!(idx.get(&FoldedKey::fold("FROBNICATE")).is_some());
        assert_eq!(idx.get(&key).unwrap().name(), "Frobnicate");
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut idx: NameIndex<()> = NameIndex::new();
        let key = FoldedKey::fold("E");
        assert!(matches!(
            idx.put_if_absent(key.clone(), EventRecord::new("E")),
            Insert::Inserted
        ));
        assert!(matches!(
            idx.put_if_absent(key, EventRecord::new("e")),
            Insert::AlreadyPresent
        ));
    }

    #[test]
    fn non_ascii_bytes_compare_as_is() {
        assert_ne!(FoldedKey::fold("café"), FoldedKey::fold("CAFÉ"));
        assert_eq!(FoldedKey::fold("cafe"), FoldedKey::fold("CAFE"));
    }
}
