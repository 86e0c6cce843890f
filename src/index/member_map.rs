//! Indices for `EventMap`/`PropertyMap` rows and `MethodImpl` occurrences.
//!
//! Both map tables relate a `TypeDef` row to the first row of a child list
//! and gain at most one row per type over the type's entire lifetime; the
//! look-through therefore consults the rows added by previous deltas *and*
//! the generation-0 map the baseline carries. `MethodImpl` rows have no
//! stable identity at all - the same implementing method legitimately appears
//! once per override - so they are keyed by `(method_row, occurrence)` with
//! the occurrence probing past every slot already taken in any generation.

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::baseline::MethodImplKey;

/// Row index for `EventMap` or `PropertyMap`, keyed by owning `TypeDef` row.
#[derive(Debug)]
pub struct MemberMapIndex<'a> {
    first_row_id: u32,
    added: IndexMap<u32, u32, FxBuildHasher>,
    previous_added: &'a FxHashMap<u32, u32>,
    baseline_rows: &'a FxHashMap<u32, u32>,
}

impl<'a> MemberMapIndex<'a> {
    /// Creates an index continuing from `previous_size` rows, resolving
    /// through the previous deltas' additions and the generation-0 map.
    #[must_use]
    pub fn new(
        previous_size: u32,
        previous_added: &'a FxHashMap<u32, u32>,
        baseline_rows: &'a FxHashMap<u32, u32>,
    ) -> Self {
        Self {
            first_row_id: previous_size + 1,
            added: IndexMap::default(),
            previous_added,
            baseline_rows,
        }
    }

    /// Map row of a type, across all generations.
    #[must_use]
    pub fn try_get(&self, type_row: u32) -> Option<u32> {
        self.added
            .get(&type_row)
            .or_else(|| self.previous_added.get(&type_row))
            .or_else(|| self.baseline_rows.get(&type_row))
            .copied()
    }

    /// Assigns a map row to a type that has none yet. Called at most once per
    /// type, the first time the delta touches one of its events/properties.
    ///
    /// # Panics
    ///
    /// Panics if the type already has a map row in any generation.
    pub fn add(&mut self, type_row: u32) -> u32 {
        assert!(self.try_get(type_row).is_none(), "type row {type_row} already has a map row");
        let row_id = self.first_row_id + self.added.len() as u32;
        self.added.insert(type_row, row_id);
        row_id
    }

    /// Number of map rows added by this delta.
    #[must_use]
    pub fn added_count(&self) -> u32 {
        self.added.len() as u32
    }

    /// Rows added by this delta in row-ID order, as `(map_row, type_row)`.
    pub fn rows(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.added.iter().map(|(&type_row, &map_row)| (map_row, type_row))
    }

    /// Additions as `(type_row, map_row)`, for the baseline merge.
    #[must_use]
    pub fn added_map(&self) -> FxHashMap<u32, u32> {
        self.added.iter().map(|(&t, &m)| (t, m)).collect()
    }
}

/// Row index for `MethodImpl`, keyed by implementing-method occurrence.
#[derive(Debug)]
pub struct MethodImplIndex<'a> {
    first_row_id: u32,
    added: IndexMap<MethodImplKey, u32, FxBuildHasher>,
    previous: &'a FxHashMap<MethodImplKey, u32>,
}

impl<'a> MethodImplIndex<'a> {
    /// Creates an index continuing from `previous_size` rows.
    #[must_use]
    pub fn new(previous_size: u32, previous: &'a FxHashMap<MethodImplKey, u32>) -> Self {
        Self { first_row_id: previous_size + 1, added: IndexMap::default(), previous }
    }

    /// Records the next `MethodImpl` row for an implementing method. The
    /// occurrence index starts at 1 and probes past every occurrence already
    /// emitted for the method, in this delta or any earlier generation.
    pub fn add(&mut self, method_row: u32) -> (MethodImplKey, u32) {
        let mut occurrence = 1;
        loop {
            let key = MethodImplKey { method_row, occurrence };
            if !self.added.contains_key(&key) && !self.previous.contains_key(&key) {
                let row_id = self.first_row_id + self.added.len() as u32;
                self.added.insert(key, row_id);
                return (key, row_id);
            }
            occurrence += 1;
        }
    }

    /// Number of rows added by this delta.
    #[must_use]
    pub fn added_count(&self) -> u32 {
        self.added.len() as u32
    }

    /// Additions in row-ID order, for the baseline merge.
    pub fn added_entries(&self) -> impl Iterator<Item = (MethodImplKey, u32)> + '_ {
        self.added.iter().map(|(&key, &row)| (key, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_map_look_through_layers() {
        let mut previous_added = FxHashMap::default();
        previous_added.insert(8, 3); // map row added by an earlier delta
        let mut baseline_rows = FxHashMap::default();
        baseline_rows.insert(2, 1); // generation-0 map row

        let mut index = MemberMapIndex::new(3, &previous_added, &baseline_rows);
        assert_eq!(index.try_get(8), Some(3));
        assert_eq!(index.try_get(2), Some(1));
        assert_eq!(index.try_get(4), None);

        assert_eq!(index.add(4), 4);
        assert_eq!(index.try_get(4), Some(4));
        assert_eq!(index.added_count(), 1);
    }

    #[test]
    #[should_panic(expected = "already has a map row")]
    fn test_member_map_rejects_double_add() {
        let previous_added = FxHashMap::default();
        let baseline_rows = FxHashMap::default();
        let mut index = MemberMapIndex::new(0, &previous_added, &baseline_rows);
        index.add(4);
        index.add(4);
    }

    #[test]
    fn test_method_impl_occurrence_probing() {
        let mut previous = FxHashMap::default();
        previous.insert(MethodImplKey { method_row: 7, occurrence: 1 }, 2);

        let mut index = MethodImplIndex::new(2, &previous);

        // Method 7 already has occurrence 1 from the baseline.
        let (key, row) = index.add(7);
        assert_eq!(key, MethodImplKey { method_row: 7, occurrence: 2 });
        assert_eq!(row, 3);

        // Adding again probes past the occurrence just taken.
        let (key, row) = index.add(7);
        assert_eq!(key.occurrence, 3);
        assert_eq!(row, 4);

        // A method with no history starts at occurrence 1.
        let (key, row) = index.add(9);
        assert_eq!(key, MethodImplKey { method_row: 9, occurrence: 1 });
        assert_eq!(row, 5);

        assert_eq!(index.added_count(), 3);
    }
}
