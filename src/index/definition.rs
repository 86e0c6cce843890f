//! Row indices for definition tables.
//!
//! A definition index owns the row numbering of one metadata table for the
//! delta being emitted. It is seeded with the baseline's cumulative row count,
//! so the first addition receives `baseline + 1` and additions stay a
//! contiguous block above everything that already exists. Rows touched by the
//! delta - fresh additions and in-place updates of pre-existing rows - are
//! collected in issue order and sorted by row ID when the index freezes.
//!
//! Resolution of a pre-existing definition looks through three layers in
//! order: rows added earlier in this same delta, rows added in previous
//! deltas (the baseline's addition maps), and finally the definition map for
//! symbols that have existed since generation 0. Definition-map hits are
//! memoized so repeated lookups stay O(1).
//!
//! Indices become read-only on first read: exposing [`DefinitionIndex::rows`]
//! freezes the index, and any later mutation is a programming error that
//! panics rather than corrupting row numbering.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::model::changes::DefinitionMap;
use crate::model::{EventId, FieldId, GenericParamKey, MethodId, ParamKey, PropertyId, TypeId};
use crate::Result;

/// A key addressing rows of one definition table, with the kind-specific hook
/// into the definition map.
pub trait DefinitionRowKey: Copy + Eq + Hash + fmt::Debug {
    /// Table name used in invariant messages.
    const KIND: &'static str;

    /// Resolves a generation-0 definition through the definition map.
    fn resolve(self, map: &dyn DefinitionMap) -> Option<u32>;
}

impl DefinitionRowKey for TypeId {
    const KIND: &'static str = "TypeDef";

    fn resolve(self, map: &dyn DefinitionMap) -> Option<u32> {
        map.type_row(self)
    }
}

impl DefinitionRowKey for MethodId {
    const KIND: &'static str = "MethodDef";

    fn resolve(self, map: &dyn DefinitionMap) -> Option<u32> {
        map.method_row(self)
    }
}

impl DefinitionRowKey for FieldId {
    const KIND: &'static str = "Field";

    fn resolve(self, map: &dyn DefinitionMap) -> Option<u32> {
        map.field_row(self)
    }
}

impl DefinitionRowKey for EventId {
    const KIND: &'static str = "Event";

    fn resolve(self, map: &dyn DefinitionMap) -> Option<u32> {
        map.event_row(self)
    }
}

impl DefinitionRowKey for PropertyId {
    const KIND: &'static str = "Property";

    fn resolve(self, map: &dyn DefinitionMap) -> Option<u32> {
        map.property_row(self)
    }
}

/// One row touched by the current delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexRow<K> {
    /// The definition occupying the row.
    pub item: K,
    /// The 1-based row ID.
    pub row_id: u32,
}

/// Row index of a definition table with cross-generation look-through.
pub struct DefinitionIndex<'a, K: DefinitionRowKey> {
    first_row_id: u32,
    added: IndexMap<K, u32, FxBuildHasher>,
    rows: Vec<IndexRow<K>>,
    previous: &'a FxHashMap<K, u32>,
    map: &'a dyn DefinitionMap,
    resolved: FxHashMap<K, u32>,
    frozen: bool,
}

impl<'a, K: DefinitionRowKey> DefinitionIndex<'a, K> {
    /// Creates an index continuing from `previous_size` rows, resolving
    /// earlier-delta additions through `previous` and generation-0 symbols
    /// through `map`.
    pub fn new(previous_size: u32, previous: &'a FxHashMap<K, u32>, map: &'a dyn DefinitionMap) -> Self {
        Self {
            first_row_id: previous_size + 1,
            added: IndexMap::default(),
            rows: Vec::new(),
            previous,
            map,
            resolved: FxHashMap::default(),
            frozen: false,
        }
    }

    /// Row ID the next addition will receive.
    #[must_use]
    pub fn next_row_id(&self) -> u32 {
        self.first_row_id + self.added.len() as u32
    }

    /// Resolves a definition to its row, looking through this delta's
    /// additions, previous deltas' additions, and the definition map, in that
    /// order. Definition-map hits are memoized.
    pub fn try_get(&mut self, item: K) -> Option<u32> {
        if let Some(&row) = self.added.get(&item) {
            return Some(row);
        }
        if let Some(&row) = self.previous.get(&item) {
            return Some(row);
        }
        if let Some(&row) = self.resolved.get(&item) {
            return Some(row);
        }
        let row = item.resolve(self.map)?;
        self.resolved.insert(item, row);
        Some(row)
    }

    /// Assigns the next free row to a newly added definition.
    ///
    /// # Panics
    ///
    /// Panics if the index is frozen or the definition was already added;
    /// both are programming errors in the change driver.
    pub fn add(&mut self, item: K) -> u32 {
        assert!(!self.frozen, "{} index is frozen", K::KIND);
        let row_id = self.next_row_id();
        let previous = self.added.insert(item, row_id);
        assert!(previous.is_none(), "{} {item:?} added twice", K::KIND);
        self.rows.push(IndexRow { item, row_id });
        tracing::trace!(kind = K::KIND, row_id, "added definition row");
        row_id
    }

    /// Records an in-place update of a pre-existing definition. The row keeps
    /// the ID it was assigned when first emitted; only the touched-row list
    /// grows, so the `EncLog` emits a `Default` row for it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Invariant`] if the definition does not resolve
    /// to an existing row - an updated symbol must exist somewhere in the
    /// baseline's history.
    ///
    /// # Panics
    ///
    /// Panics if the index is frozen or the definition was added in this same
    /// delta (an added row cannot also be an update).
    pub fn add_updated(&mut self, item: K) -> Result<u32> {
        assert!(!self.frozen, "{} index is frozen", K::KIND);
        assert!(
            !self.added.contains_key(&item),
            "{} {item:?} both added and updated",
            K::KIND
        );
        let row_id = self.try_get(item).ok_or_else(|| {
            invariant_error!("updated {} {:?} does not resolve to an existing row", K::KIND, item)
        })?;
        self.rows.push(IndexRow { item, row_id });
        tracing::trace!(kind = K::KIND, row_id, "updated definition row");
        Ok(row_id)
    }

    /// True when the definition was added (not merely updated) in this delta.
    #[must_use]
    pub fn is_added_not_changed(&self, item: K) -> bool {
        self.added.contains_key(&item)
    }

    /// Number of rows added (updates do not grow the table).
    #[must_use]
    pub fn added_count(&self) -> u32 {
        self.added.len() as u32
    }

    /// Additions in row-ID order, for the baseline merge.
    pub fn added_entries(&self) -> impl Iterator<Item = (K, u32)> + '_ {
        self.added.iter().map(|(&item, &row)| (item, row))
    }

    /// The rows touched by this delta, sorted strictly ascending by row ID.
    /// The first call freezes the index; all mutation panics afterwards.
    pub fn rows(&mut self) -> &[IndexRow<K>] {
        if !self.frozen {
            self.frozen = true;
            self.rows.sort_by_key(|row| row.row_id);
            debug_assert!(
                self.rows.windows(2).all(|pair| pair[0].row_id < pair[1].row_id),
                "{} rows are not strictly ascending",
                K::KIND
            );
        }
        &self.rows
    }
}

/// Row index for tables whose rows are always fresh in a delta (parameters
/// and generic parameters of added or edited methods). No look-through: these
/// rows have no cross-generation identity to resolve.
#[derive(Debug)]
pub struct FreshIndex<K: Copy + Eq + Hash + fmt::Debug> {
    first_row_id: u32,
    added: IndexMap<K, u32, FxBuildHasher>,
    frozen: bool,
}

impl<K: Copy + Eq + Hash + fmt::Debug> FreshIndex<K> {
    /// Creates an index continuing from `previous_size` rows.
    #[must_use]
    pub fn new(previous_size: u32) -> Self {
        Self { first_row_id: previous_size + 1, added: IndexMap::default(), frozen: false }
    }

    /// Assigns the next free row.
    ///
    /// # Panics
    ///
    /// Panics if the index is frozen or the key was already added.
    pub fn add(&mut self, item: K) -> u32 {
        assert!(!self.frozen, "index is frozen");
        let row_id = self.first_row_id + self.added.len() as u32;
        let previous = self.added.insert(item, row_id);
        assert!(previous.is_none(), "{item:?} added twice");
        row_id
    }

    /// Row assigned to a key in this delta, if any.
    #[must_use]
    pub fn get(&self, item: K) -> Option<u32> {
        self.added.get(&item).copied()
    }

    /// Number of rows added.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.added.len() as u32
    }

    /// Rows in assignment order (which is row-ID order by construction).
    /// The first call freezes the index.
    pub fn rows(&mut self) -> impl Iterator<Item = (K, u32)> + '_ {
        self.frozen = true;
        self.added.iter().map(|(&item, &row)| (item, row))
    }
}

/// Convenience aliases for the two fresh-index instantiations the writer uses.
pub type ParameterIndex = FreshIndex<ParamKey>;
/// See [`ParameterIndex`].
pub type GenericParameterIndex = FreshIndex<GenericParamKey>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::changes::RowMap;

    #[test]
    fn test_additions_are_contiguous_above_baseline() {
        let previous = FxHashMap::default();
        let map = RowMap::new();
        let mut index = DefinitionIndex::new(12, &previous, &map);

        assert_eq!(index.add(MethodId(1)), 13);
        assert_eq!(index.add(MethodId(2)), 14);
        assert_eq!(index.add(MethodId(3)), 15);
        assert_eq!(index.added_count(), 3);
        assert_eq!(index.next_row_id(), 16);
    }

    #[test]
    fn test_lookup_order_delta_then_previous_then_map() {
        let mut previous = FxHashMap::default();
        previous.insert(MethodId(7), 9); // added two deltas ago
        let mut map = RowMap::new();
        map.methods.insert(MethodId(5), 3); // present since generation 0

        let mut index = DefinitionIndex::new(12, &previous, &map);
        let fresh = index.add(MethodId(20));

        assert_eq!(index.try_get(MethodId(20)), Some(fresh));
        assert_eq!(index.try_get(MethodId(7)), Some(9));
        assert_eq!(index.try_get(MethodId(5)), Some(3));
        assert_eq!(index.try_get(MethodId(99)), None);

        // Second generation-0 lookup is served from the memo.
        assert_eq!(index.try_get(MethodId(5)), Some(3));
    }

    #[test]
    fn test_updated_rows_keep_their_ids_and_interleave() {
        let previous = FxHashMap::default();
        let mut map = RowMap::new();
        map.methods.insert(MethodId(5), 7);

        let mut index = DefinitionIndex::new(12, &previous, &map);
        index.add(MethodId(1)); // row 13
        index.add_updated(MethodId(5)).unwrap(); // keeps row 7
        index.add(MethodId(2)); // row 14

        assert!(index.is_added_not_changed(MethodId(1)));
        assert!(!index.is_added_not_changed(MethodId(5)));
        assert_eq!(index.added_count(), 2); // updates do not grow the table

        let rows: Vec<u32> = index.rows().iter().map(|r| r.row_id).collect();
        assert_eq!(rows, [7, 13, 14]); // sorted ascending on freeze
    }

    #[test]
    fn test_update_of_unknown_definition_is_invariant_violation() {
        let previous = FxHashMap::default();
        let map = RowMap::new();
        let mut index: DefinitionIndex<'_, MethodId> = DefinitionIndex::new(0, &previous, &map);
        assert!(index.add_updated(MethodId(1)).is_err());
    }

    #[test]
    #[should_panic(expected = "frozen")]
    fn test_add_after_freeze_panics() {
        let previous = FxHashMap::default();
        let map = RowMap::new();
        let mut index = DefinitionIndex::new(0, &previous, &map);
        index.add(FieldId(1));
        let _ = index.rows();
        index.add(FieldId(2));
    }

    #[test]
    fn test_fresh_index_rows_in_assignment_order() {
        let mut index: FreshIndex<ParamKey> = FreshIndex::new(20);
        let key1 = ParamKey { method: MethodId(1), sequence: 1 };
        let key2 = ParamKey { method: MethodId(1), sequence: 2 };
        assert_eq!(index.add(key1), 21);
        assert_eq!(index.add(key2), 22);
        assert_eq!(index.get(key1), Some(21));
        assert_eq!(index.count(), 2);

        let rows: Vec<u32> = index.rows().map(|(_, row)| row).collect();
        assert_eq!(rows, [21, 22]);
    }
}
