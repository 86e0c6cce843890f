//! The immutable emit baseline and its generation-to-generation merge.
//!
//! An [`EmitBaseline`] is everything the next delta needs in order to continue
//! numbering where the previous generation stopped: cumulative table sizes,
//! heap stream lengths, the row IDs assigned to symbols added in earlier
//! deltas, the event/property map rows established so far, `MethodImpl`
//! occurrence bookkeeping, and the per-method debug records. Baselines are
//! never mutated; [`EmitBaseline::advance`] produces the successor record from
//! the previous baseline plus the current delta's additions.
//!
//! Merging is append-only over disjoint key sets for every `*_added` map
//! (row IDs are never reassigned), which is what makes the merge associative:
//! folding two deltas into a baseline one at a time or all at once yields the
//! same record.

use rustc_hash::FxHashMap;

use crate::metadata::guid::Guid;
use crate::metadata::heaps::HeapLengths;
use crate::metadata::tables::TableSizes;
use crate::model::debug_info::MethodDebugInfo;
use crate::model::{AnonymousTypeValue, EventId, FieldId, MethodId, PropertyId, TypeId};

/// Key of a `MethodImpl` row: implementing-method row plus a 1-based
/// occurrence index distinguishing multiple overrides by the same method.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MethodImplKey {
    /// `MethodDef` row of the implementing method.
    pub method_row: u32,
    /// 1-based occurrence index.
    pub occurrence: u32,
}

/// Immutable record of everything emitted up to and including one generation.
#[derive(Clone, Debug)]
pub struct EmitBaseline {
    /// Generation number; 0 is the original PE, each delta increments it.
    pub ordinal: u32,
    /// GUID identifying this generation.
    pub enc_id: Guid,
    /// GUID of the generation immediately preceding this one.
    pub enc_base_id: Guid,
    /// Cumulative row counts after this generation, for every table.
    pub table_sizes: TableSizes,
    /// Cumulative heap stream lengths after this generation.
    pub heap_lengths: HeapLengths,
    /// Types added in generations 1..=ordinal, by assigned row.
    pub types_added: FxHashMap<TypeId, u32>,
    /// Methods added in generations 1..=ordinal, by assigned row.
    pub methods_added: FxHashMap<MethodId, u32>,
    /// Fields added in generations 1..=ordinal, by assigned row.
    pub fields_added: FxHashMap<FieldId, u32>,
    /// Events added in generations 1..=ordinal, by assigned row.
    pub events_added: FxHashMap<EventId, u32>,
    /// Properties added in generations 1..=ordinal, by assigned row.
    pub properties_added: FxHashMap<PropertyId, u32>,
    /// `EventMap` rows added in generations 1..=ordinal: type row to map row.
    pub event_map_added: FxHashMap<u32, u32>,
    /// `PropertyMap` rows added in generations 1..=ordinal: type row to map row.
    pub property_map_added: FxHashMap<u32, u32>,
    /// Generation-0 `EventMap` rows: type row to map row.
    pub type_event_rows: FxHashMap<u32, u32>,
    /// Generation-0 `PropertyMap` rows: type row to map row.
    pub type_property_rows: FxHashMap<u32, u32>,
    /// `MethodImpl` rows emitted so far, by occurrence key.
    pub method_impls: FxHashMap<MethodImplKey, u32>,
    /// Debug records of every method body emitted in generations 1..=ordinal,
    /// keyed by `MethodDef` row; later generations overlay earlier ones.
    pub added_or_changed_methods: FxHashMap<u32, MethodDebugInfo>,
    /// Anonymous type templates known to the baseline.
    pub anonymous_types: FxHashMap<String, AnonymousTypeValue>,
    /// Synthesized member names per type known to the baseline.
    pub synthesized_members: FxHashMap<TypeId, Vec<String>>,
}

impl EmitBaseline {
    /// Creates the generation-0 baseline from the original PE's table sizes
    /// and heap lengths. The generation-0 `EventMap`/`PropertyMap` rows and
    /// the `MethodImpl` occupancy are filled in by the host's metadata reader.
    #[must_use]
    pub fn initial(table_sizes: TableSizes, heap_lengths: HeapLengths, enc_id: Guid) -> Self {
        Self {
            ordinal: 0,
            enc_id,
            enc_base_id: Guid::ZERO,
            table_sizes,
            heap_lengths,
            types_added: FxHashMap::default(),
            methods_added: FxHashMap::default(),
            fields_added: FxHashMap::default(),
            events_added: FxHashMap::default(),
            properties_added: FxHashMap::default(),
            event_map_added: FxHashMap::default(),
            property_map_added: FxHashMap::default(),
            type_event_rows: FxHashMap::default(),
            type_property_rows: FxHashMap::default(),
            method_impls: FxHashMap::default(),
            added_or_changed_methods: FxHashMap::default(),
            anonymous_types: FxHashMap::default(),
            synthesized_members: FxHashMap::default(),
        }
    }

    /// Produces the baseline for the generation after this one.
    ///
    /// Every `*_added` map is extended by the delta's additions, table sizes
    /// and heap lengths accumulate, and the per-method debug records are
    /// overlaid (the delta's entry replaces any earlier entry for the same
    /// row). The anonymous type map and synthesized member set are taken from
    /// the current module when this baseline is generation 0 and carried
    /// forward unchanged otherwise.
    #[must_use]
    pub fn advance(&self, delta: BaselineDelta) -> EmitBaseline {
        let extend = |previous: &FxHashMap<u32, u32>, additions: &FxHashMap<u32, u32>| {
            let mut merged = previous.clone();
            merged.extend(additions.iter().map(|(&k, &v)| (k, v)));
            merged
        };

        let mut types_added = self.types_added.clone();
        types_added.extend(delta.types_added);
        let mut methods_added = self.methods_added.clone();
        methods_added.extend(delta.methods_added);
        let mut fields_added = self.fields_added.clone();
        fields_added.extend(delta.fields_added);
        let mut events_added = self.events_added.clone();
        events_added.extend(delta.events_added);
        let mut properties_added = self.properties_added.clone();
        properties_added.extend(delta.properties_added);

        let mut method_impls = self.method_impls.clone();
        method_impls.extend(delta.method_impls);

        let mut added_or_changed_methods = self.added_or_changed_methods.clone();
        added_or_changed_methods.extend(delta.added_or_changed_methods);

        let (anonymous_types, synthesized_members) = if self.ordinal == 0 {
            (delta.anonymous_types, delta.synthesized_members)
        } else {
            (self.anonymous_types.clone(), self.synthesized_members.clone())
        };

        EmitBaseline {
            ordinal: self.ordinal + 1,
            enc_id: delta.enc_id,
            enc_base_id: self.enc_id,
            table_sizes: self.table_sizes.adding(&delta.table_sizes),
            heap_lengths: delta.heap_lengths,
            types_added,
            methods_added,
            fields_added,
            events_added,
            properties_added,
            event_map_added: extend(&self.event_map_added, &delta.event_map_added),
            property_map_added: extend(&self.property_map_added, &delta.property_map_added),
            type_event_rows: self.type_event_rows.clone(),
            type_property_rows: self.type_property_rows.clone(),
            method_impls,
            added_or_changed_methods,
            anonymous_types,
            synthesized_members,
        }
    }
}

/// The additions one delta contributes to the next baseline.
#[derive(Clone, Debug, Default)]
pub struct BaselineDelta {
    /// GUID of the generation being produced.
    pub enc_id: Guid,
    /// Rows this delta added, per table.
    pub table_sizes: TableSizes,
    /// Heap lengths after this delta (already alignment-padded).
    pub heap_lengths: HeapLengths,
    /// Types assigned rows in this delta.
    pub types_added: Vec<(TypeId, u32)>,
    /// Methods assigned rows in this delta.
    pub methods_added: Vec<(MethodId, u32)>,
    /// Fields assigned rows in this delta.
    pub fields_added: Vec<(FieldId, u32)>,
    /// Events assigned rows in this delta.
    pub events_added: Vec<(EventId, u32)>,
    /// Properties assigned rows in this delta.
    pub properties_added: Vec<(PropertyId, u32)>,
    /// `EventMap` rows assigned in this delta.
    pub event_map_added: FxHashMap<u32, u32>,
    /// `PropertyMap` rows assigned in this delta.
    pub property_map_added: FxHashMap<u32, u32>,
    /// `MethodImpl` rows assigned in this delta.
    pub method_impls: Vec<(MethodImplKey, u32)>,
    /// Debug records of the bodies emitted in this delta, by method row.
    pub added_or_changed_methods: FxHashMap<u32, MethodDebugInfo>,
    /// Module's anonymous types, adopted when advancing from generation 0.
    pub anonymous_types: FxHashMap<String, AnonymousTypeValue>,
    /// Module's synthesized members, adopted when advancing from generation 0.
    pub synthesized_members: FxHashMap<TypeId, Vec<String>>,
}

impl Default for EmitBaseline {
    fn default() -> Self {
        Self::initial(TableSizes::new(), HeapLengths::default(), Guid::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::TableId;
    use crate::model::debug_info::{MethodDebugId, MethodDebugInfo};

    fn debug_info(ordinal: u32, generation: u32) -> MethodDebugInfo {
        MethodDebugInfo {
            id: MethodDebugId { ordinal, generation },
            locals: Vec::new(),
            lambdas: Vec::new(),
            closures: Vec::new(),
            state_machine: None,
        }
    }

    fn base() -> EmitBaseline {
        let mut sizes = TableSizes::new();
        sizes[TableId::TypeDef] = 5;
        sizes[TableId::MethodDef] = 12;
        EmitBaseline::initial(
            sizes,
            HeapLengths { string: 100, user_string: 40, blob: 60, guid: 16 },
            Guid::from_bytes([1; 16]),
        )
    }

    #[test]
    fn test_advance_chains_generation_ids() {
        let g1_id = Guid::from_bytes([2; 16]);
        let next = base().advance(BaselineDelta { enc_id: g1_id, ..BaselineDelta::default() });
        assert_eq!(next.ordinal, 1);
        assert_eq!(next.enc_id, g1_id);
        assert_eq!(next.enc_base_id, Guid::from_bytes([1; 16]));
    }

    #[test]
    fn test_advance_accumulates_sizes_and_rows() {
        let mut delta_sizes = TableSizes::new();
        delta_sizes[TableId::MethodDef] = 1;
        let next = base().advance(BaselineDelta {
            enc_id: Guid::from_bytes([2; 16]),
            table_sizes: delta_sizes,
            heap_lengths: HeapLengths { string: 110, user_string: 44, blob: 64, guid: 48 },
            methods_added: vec![(MethodId(9), 13)],
            ..BaselineDelta::default()
        });
        assert_eq!(next.table_sizes[TableId::MethodDef], 13);
        assert_eq!(next.table_sizes[TableId::TypeDef], 5);
        assert_eq!(next.heap_lengths.string, 110);
        assert_eq!(next.methods_added.get(&MethodId(9)), Some(&13));
    }

    #[test]
    fn test_sequential_advances_union_disjoint_additions() {
        let b0 = base();
        let b1 = b0.advance(BaselineDelta {
            enc_id: Guid::from_bytes([2; 16]),
            methods_added: vec![(MethodId(9), 13)],
            added_or_changed_methods: [(13, debug_info(9, 1))].into_iter().collect(),
            ..BaselineDelta::default()
        });
        let b2 = b1.advance(BaselineDelta {
            enc_id: Guid::from_bytes([3; 16]),
            methods_added: vec![(MethodId(10), 14)],
            added_or_changed_methods: [(13, debug_info(9, 2)), (14, debug_info(10, 2))]
                .into_iter()
                .collect(),
            ..BaselineDelta::default()
        });

        // Additions union across generations; row IDs never move.
        assert_eq!(b2.methods_added.get(&MethodId(9)), Some(&13));
        assert_eq!(b2.methods_added.get(&MethodId(10)), Some(&14));

        // Debug records overlay: the later generation wins for row 13.
        assert_eq!(b2.added_or_changed_methods[&13].id.generation, 2);
        assert_eq!(b2.added_or_changed_methods[&14].id.generation, 2);
        assert_eq!(b2.ordinal, 2);
        assert_eq!(b2.enc_base_id, b1.enc_id);
    }

    #[test]
    fn test_anonymous_types_adopted_only_from_generation_zero() {
        let module_map: FxHashMap<String, AnonymousTypeValue> = [(
            "Name|Age".to_string(),
            AnonymousTypeValue { name: "<>f__AnonymousType0".into(), unique_index: 0 },
        )]
        .into_iter()
        .collect();

        let b1 = base().advance(BaselineDelta {
            enc_id: Guid::from_bytes([2; 16]),
            anonymous_types: module_map.clone(),
            ..BaselineDelta::default()
        });
        assert_eq!(b1.anonymous_types, module_map);

        // From generation 1 onward the baseline's map is carried forward even
        // if the delta offers a different one.
        let b2 = b1.advance(BaselineDelta {
            enc_id: Guid::from_bytes([3; 16]),
            anonymous_types: FxHashMap::default(),
            ..BaselineDelta::default()
        });
        assert_eq!(b2.anonymous_types, module_map);
    }
}
