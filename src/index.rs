//! Connection Index (design component C): seven independent ordered sets
//! of [`ConnectionRecord`]s, one per [`Family`], keyed by [`Identity`].

use std::collections::BTreeMap;

use crate::connection::ConnectionRecord;
use crate::estats::{new_tracker, Family};
use crate::identity::Identity;

/// One family's ordered set of connection records.
#[derive(Default)]
struct FamilyIndex {
    records: BTreeMap<Identity, ConnectionRecord>,
}

impl FamilyIndex {
    fn upsert(&mut self, identity: Identity, family: Family, tick: u64) -> (&ConnectionRecord, bool) {
        let inserted = !self.records.contains_key(&identity);
        let record = self
            .records
            .entry(identity)
            .or_insert_with(|| ConnectionRecord::new(identity, new_tracker(family), tick));
        (record, inserted)
    }
}

/// The seven parallel per-family indices, addressed by [`Family`].
pub struct ConnectionIndex {
    families: [FamilyIndex; 7],
}

impl Default for ConnectionIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionIndex {
    pub fn new() -> Self {
        Self { families: std::array::from_fn(|_| FamilyIndex::default()) }
    }

    fn slot(&self, family: Family) -> &FamilyIndex {
        &self.families[family as usize]
    }

    fn slot_mut(&mut self, family: Family) -> &mut FamilyIndex {
        &mut self.families[family as usize]
    }

    /// Insert a fresh [`ConnectionRecord`] for `identity` in `family` if
    /// absent. Returns the record and whether insertion occurred.
    pub fn upsert(&mut self, family: Family, identity: Identity, tick: u64) -> (&ConnectionRecord, bool) {
        self.slot_mut(family).upsert(identity, family, tick)
    }

    pub fn find(&self, family: Family, identity: &Identity) -> Option<&ConnectionRecord> {
        self.slot(family).records.get(identity)
    }

    pub fn iter(&self, family: Family) -> impl Iterator<Item = &ConnectionRecord> {
        self.slot(family).records.values()
    }

    pub fn len(&self, family: Family) -> usize {
        self.slot(family).records.len()
    }

    pub fn is_empty(&self, family: Family) -> bool {
        self.slot(family).records.is_empty()
    }

    pub fn erase(&mut self, family: Family, identity: &Identity) -> Option<ConnectionRecord> {
        self.slot_mut(family).records.remove(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Endpoint;

    fn id(port: u16) -> Identity {
        Identity::new(Endpoint::v4([10, 0, 0, 1], port), Endpoint::v4([10, 0, 0, 2], 80))
    }

    #[test]
    fn upsert_reports_insertion_only_once() {
        let mut index = ConnectionIndex::new();
        let identity = id(1234);
        let (_, inserted) = index.upsert(Family::Data, identity, 1);
        assert!(inserted);
        let (_, inserted_again) = index.upsert(Family::Data, identity, 2);
        assert!(!inserted_again);
        assert_eq!(index.len(Family::Data), 1);
    }

    #[test]
    fn families_are_independent() {
        let mut index = ConnectionIndex::new();
        let identity = id(1234);
        index.upsert(Family::Data, identity, 1);
        assert!(index.find(Family::Path, &identity).is_none());
        assert!(index.find(Family::Data, &identity).is_some());
    }

    #[test]
    fn erase_removes_from_only_the_named_family() {
        let mut index = ConnectionIndex::new();
        let identity = id(1234);
        index.upsert(Family::Data, identity, 1);
        index.upsert(Family::Path, identity, 1);
        index.erase(Family::Data, &identity);
        assert!(index.find(Family::Data, &identity).is_none());
        assert!(index.find(Family::Path, &identity).is_some());
    }
}
