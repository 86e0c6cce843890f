//! Content-addressed row indices for reference tables.
//!
//! Reference rows (`AssemblyRef`, `ModuleRef`, `TypeRef`, `TypeSpec`,
//! `MemberRef`, `MethodSpec`, `StandAloneSig`) have no cross-generation
//! identity to track; they are pure values, deduplicated structurally:
//! [`ReferenceIndex::get_or_add`] returns the same row for value-equal inputs,
//! making duplicates impossible by construction. Row numbering continues the
//! baseline's table sizes, and insertion order is row-ID order.
//!
//! The value shapes mirror the corresponding table rows. `TypeSpec` and
//! `StandAloneSig` values are the serialized signature blobs themselves, so
//! two constructed types dedupe exactly when their wire encodings agree.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::metadata::token::Token;
use crate::model::refs::{AssemblyReference, ModuleReference};
use crate::model::{Definition, TypeId};

/// A `TypeRef` row value: resolution scope token plus namespace and name.
///
/// `resolves_to` rides along for the post-freeze diagnostic sweep; it is part
/// of the value because a reference target resolves the same way at every
/// occurrence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeRefValue {
    /// Token of the resolution scope (`AssemblyRef`, `ModuleRef` or an
    /// enclosing `TypeRef` for nested types).
    pub scope: Token,
    /// Namespace, empty for nested types.
    pub namespace: String,
    /// Simple name.
    pub name: String,
    /// The local definition this reference lands on, if any.
    pub resolves_to: Option<TypeId>,
}

/// A `TypeSpec` row value: the serialized signature of a constructed type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeSpecValue {
    /// Signature blob bytes.
    pub signature: Vec<u8>,
}

/// A `MemberRef` row value: parent token, member name and signature blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberRefValue {
    /// Token of the containing type (`TypeRef`, `TypeSpec` or `TypeDef`).
    pub parent: Token,
    /// Simple member name.
    pub name: String,
    /// Pre-serialized member signature blob.
    pub signature: Vec<u8>,
    /// The local definition this reference lands on, if any.
    pub resolves_to: Option<Definition>,
}

/// A `MethodSpec` row value: generic method token plus instantiation blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodSpecValue {
    /// Token of the generic method (`MethodDef` or `MemberRef`).
    pub method: Token,
    /// Serialized instantiation blob.
    pub instantiation: Vec<u8>,
}

/// A `StandAloneSig` row value: the signature blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StandAloneSigValue {
    /// Signature blob bytes.
    pub signature: Vec<u8>,
}

/// A content-addressed row index for one reference table.
#[derive(Debug)]
pub struct ReferenceIndex<V: Clone + Eq + Hash + fmt::Debug> {
    first_row_id: u32,
    added: IndexMap<V, u32, FxBuildHasher>,
    frozen: bool,
}

impl<V: Clone + Eq + Hash + fmt::Debug> ReferenceIndex<V> {
    /// Creates an index continuing from `previous_size` rows.
    #[must_use]
    pub fn new(previous_size: u32) -> Self {
        Self { first_row_id: previous_size + 1, added: IndexMap::default(), frozen: false }
    }

    /// Returns the row of a value, assigning the next free row on first sight.
    ///
    /// # Panics
    ///
    /// Panics when a *new* value arrives after the index was frozen; looking
    /// up values that already have rows stays legal.
    pub fn get_or_add(&mut self, value: V) -> u32 {
        if let Some(&row) = self.added.get(&value) {
            return row;
        }
        assert!(!self.frozen, "reference index is frozen");
        let row_id = self.first_row_id + self.added.len() as u32;
        self.added.insert(value, row_id);
        row_id
    }

    /// Row of a value, without inserting.
    #[must_use]
    pub fn get(&self, value: &V) -> Option<u32> {
        self.added.get(value).copied()
    }

    /// Number of rows added by this delta.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.added.len() as u32
    }

    /// Row of the first addition (`previous_size + 1`).
    #[must_use]
    pub fn first_row_id(&self) -> u32 {
        self.first_row_id
    }

    /// Marks the index read-only.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Rows in assignment order (which is row-ID order by construction).
    pub fn rows(&self) -> impl Iterator<Item = (&V, u32)> + '_ {
        self.added.iter().map(|(value, &row)| (value, row))
    }
}

/// The reference indices use the model's nominal values directly as keys.
pub type AssemblyRefIndex = ReferenceIndex<AssemblyReference>;
/// See [`AssemblyRefIndex`].
pub type ModuleRefIndex = ReferenceIndex<ModuleReference>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::TableId;

    fn console_ref(scope: Token) -> TypeRefValue {
        TypeRefValue {
            scope,
            namespace: "System".into(),
            name: "Console".into(),
            resolves_to: None,
        }
    }

    #[test]
    fn test_get_or_add_deduplicates_by_value() {
        let scope = Token::from_parts(TableId::AssemblyRef, 1);
        let mut index: ReferenceIndex<TypeRefValue> = ReferenceIndex::new(40);

        let first = index.get_or_add(console_ref(scope));
        let again = index.get_or_add(console_ref(scope));
        assert_eq!(first, 41);
        assert_eq!(again, first);
        assert_eq!(index.count(), 1);

        let other = index.get_or_add(TypeRefValue {
            scope,
            namespace: "System".into(),
            name: "String".into(),
            resolves_to: None,
        });
        assert_eq!(other, 42);
    }

    #[test]
    fn test_frozen_index_still_answers_lookups() {
        let mut index: ReferenceIndex<StandAloneSigValue> = ReferenceIndex::new(0);
        let sig = StandAloneSigValue { signature: vec![0x07, 0x01, 0x08] };
        let row = index.get_or_add(sig.clone());
        index.freeze();
        assert_eq!(index.get_or_add(sig), row);
    }

    #[test]
    #[should_panic(expected = "frozen")]
    fn test_frozen_index_rejects_new_values() {
        let mut index: ReferenceIndex<StandAloneSigValue> = ReferenceIndex::new(0);
        index.freeze();
        index.get_or_add(StandAloneSigValue { signature: vec![0x07] });
    }

    #[test]
    fn test_rows_follow_assignment_order() {
        let mut index: ReferenceIndex<ModuleReference> = ReferenceIndex::new(2);
        index.get_or_add(ModuleReference { name: "native.dll".into() });
        index.get_or_add(ModuleReference { name: "other.dll".into() });

        let rows: Vec<(String, u32)> =
            index.rows().map(|(v, row)| (v.name.clone(), row)).collect();
        assert_eq!(rows, [("native.dll".to_string(), 3), ("other.dll".to_string(), 4)]);
    }
}
