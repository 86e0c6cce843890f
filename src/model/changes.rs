//! Change classification and definition resolution capabilities.
//!
//! The delta writer does not detect changes; it consumes a ready-made oracle.
//! Per the narrow-capability rule, the oracle surface is exactly what the
//! writer needs: a classification per definition, an added-ness predicate for
//! the reference sweep, and the list of top-level types whose transitive
//! closure contains any change. Everything else about the host's change
//! tracking stays on the host's side of the seam.
//!
//! [`SymbolChangeSet`] and [`RowMap`] are plain-map implementations of the two
//! traits, sufficient for hosts that precompute their classification and for
//! tests.

use rustc_hash::FxHashMap;

use crate::model::{Definition, EventId, FieldId, MethodId, PropertyId, TypeId};

/// Classification of a definition relative to the baseline generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SymbolChange {
    /// The definition does not exist in the baseline; it gets a fresh row.
    Added,
    /// The definition exists and was edited; its row is rewritten in place.
    Updated,
    /// The definition itself is untouched but something in its transitive
    /// closure changed. Valid for types; member walks recurse through it.
    ContainsChanges,
    /// Untouched; the writer must not emit anything for it.
    None,
}

/// The change oracle capability consumed by the writer.
pub trait ChangeOracle {
    /// Classifies a definition relative to the baseline.
    fn classify(&self, def: Definition) -> SymbolChange;

    /// True when the definition is newly added in this delta. Used by the
    /// reference sweep to flag references the runtime cannot yet resolve.
    fn is_added(&self, def: Definition) -> bool {
        matches!(self.classify(def), SymbolChange::Added)
    }

    /// Top-level types whose transitive closure contains any change, in the
    /// deterministic order the driver should walk them.
    fn changed_types(&self) -> &[TypeId];
}

/// The definition-map capability: resolves definitions that have existed since
/// generation 0 to their metadata row IDs.
pub trait DefinitionMap {
    /// Row of a generation-0 type definition.
    fn type_row(&self, id: TypeId) -> Option<u32>;
    /// Row of a generation-0 method definition.
    fn method_row(&self, id: MethodId) -> Option<u32>;
    /// Row of a generation-0 field definition.
    fn field_row(&self, id: FieldId) -> Option<u32>;
    /// Row of a generation-0 event definition.
    fn event_row(&self, id: EventId) -> Option<u32>;
    /// Row of a generation-0 property definition.
    fn property_row(&self, id: PropertyId) -> Option<u32>;
}

/// A precomputed [`ChangeOracle`] backed by plain maps.
///
/// Definitions absent from the map classify as [`SymbolChange::None`].
#[derive(Clone, Debug, Default)]
pub struct SymbolChangeSet {
    changes: FxHashMap<Definition, SymbolChange>,
    changed_types: Vec<TypeId>,
}

impl SymbolChangeSet {
    /// Creates an empty change set (every definition classifies as `None`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a classification for a definition.
    pub fn set(&mut self, def: Definition, change: SymbolChange) -> &mut Self {
        self.changes.insert(def, change);
        self
    }

    /// Records a changed top-level type, in walk order.
    pub fn add_changed_type(&mut self, id: TypeId) -> &mut Self {
        self.changed_types.push(id);
        self
    }
}

impl ChangeOracle for SymbolChangeSet {
    fn classify(&self, def: Definition) -> SymbolChange {
        self.changes.get(&def).copied().unwrap_or(SymbolChange::None)
    }

    fn changed_types(&self) -> &[TypeId] {
        &self.changed_types
    }
}

/// A [`DefinitionMap`] backed by plain per-kind maps.
#[derive(Clone, Debug, Default)]
pub struct RowMap {
    /// Generation-0 type rows.
    pub types: FxHashMap<TypeId, u32>,
    /// Generation-0 method rows.
    pub methods: FxHashMap<MethodId, u32>,
    /// Generation-0 field rows.
    pub fields: FxHashMap<FieldId, u32>,
    /// Generation-0 event rows.
    pub events: FxHashMap<EventId, u32>,
    /// Generation-0 property rows.
    pub properties: FxHashMap<PropertyId, u32>,
}

impl RowMap {
    /// Creates an empty map (nothing resolves).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DefinitionMap for RowMap {
    fn type_row(&self, id: TypeId) -> Option<u32> {
        self.types.get(&id).copied()
    }

    fn method_row(&self, id: MethodId) -> Option<u32> {
        self.methods.get(&id).copied()
    }

    fn field_row(&self, id: FieldId) -> Option<u32> {
        self.fields.get(&id).copied()
    }

    fn event_row(&self, id: EventId) -> Option<u32> {
        self.events.get(&id).copied()
    }

    fn property_row(&self, id: PropertyId) -> Option<u32> {
        self.properties.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclassified_definitions_are_none() {
        let set = SymbolChangeSet::new();
        assert_eq!(set.classify(Definition::Type(TypeId(0))), SymbolChange::None);
        assert!(!set.is_added(Definition::Type(TypeId(0))));
    }

    #[test]
    fn test_is_added_follows_classification() {
        let mut set = SymbolChangeSet::new();
        set.set(Definition::Method(MethodId(1)), SymbolChange::Added);
        set.set(Definition::Method(MethodId(2)), SymbolChange::Updated);
        assert!(set.is_added(Definition::Method(MethodId(1))));
        assert!(!set.is_added(Definition::Method(MethodId(2))));
    }

    #[test]
    fn test_row_map_resolution() {
        let mut map = RowMap::new();
        map.methods.insert(MethodId(4), 7);
        assert_eq!(map.method_row(MethodId(4)), Some(7));
        assert_eq!(map.method_row(MethodId(5)), None);
        assert_eq!(map.type_row(TypeId(0)), None);
    }
}
