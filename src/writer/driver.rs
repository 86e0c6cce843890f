//! The change driver: walks changed top-level types and populates the
//! definition indices.
//!
//! The oracle yields only top-level types whose transitive closure contains a
//! change; the driver dispatches on each type's own classification, walks its
//! members with [`add_member_if_necessary`] semantics, recurses into nested
//! types, and records `MethodImpl` occurrences for every override whose
//! implementing-method row resolves. Names and pre-serialized signature blobs
//! of touched definitions are interned into the delta heaps on the way, so
//! the base serializer finds everything it needs in this delta's streams.

use crate::index::definition::{DefinitionIndex, DefinitionRowKey};
use crate::model::changes::SymbolChange;
use crate::model::{Definition, GenericParamKey, ParamKey, TypeId};
use crate::writer::DeltaMetadataWriter;
use crate::Result;

/// Outcome of [`add_member_if_necessary`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum MemberAction {
    /// The member received a fresh row.
    Added,
    /// The member's existing row was marked updated.
    Updated,
    /// The member was not touched.
    Skipped,
}

/// Dispatches a member on its change classification: `Added` assigns a fresh
/// row, `Updated` re-records the existing row, everything else is skipped
/// (`ContainsChanges` is only meaningful for types, which recurse instead).
fn add_member_if_necessary<K: DefinitionRowKey>(
    index: &mut DefinitionIndex<'_, K>,
    change: SymbolChange,
    item: K,
) -> Result<MemberAction> {
    match change {
        SymbolChange::Added => {
            index.add(item);
            Ok(MemberAction::Added)
        }
        SymbolChange::Updated => {
            index.add_updated(item)?;
            Ok(MemberAction::Updated)
        }
        SymbolChange::ContainsChanges | SymbolChange::None => Ok(MemberAction::Skipped),
    }
}

impl<'a> DeltaMetadataWriter<'a> {
    /// Phase 1: populate the definition indices from the change set.
    pub(super) fn drive_changes(&mut self) -> Result<()> {
        let changed: Vec<TypeId> = self.changes.changed_types().to_vec();
        for type_id in changed {
            self.cancel.check()?;
            self.create_indices_for_type(type_id)?;
        }
        Ok(())
    }

    fn create_indices_for_type(&mut self, type_id: TypeId) -> Result<()> {
        let type_def = self.module.type_def(type_id);
        match self.changes.classify(Definition::Type(type_id)) {
            SymbolChange::Added => {
                self.type_defs.add(type_id);
                self.heaps.get_or_add_string(&type_def.namespace);
                self.heaps.get_or_add_string(&type_def.name);
                // Consolidated generic parameters: enclosing types' first.
                for (index, param) in
                    self.module.consolidated_generic_params(type_id).iter().enumerate()
                {
                    self.generic_params
                        .add(GenericParamKey { owner: Definition::Type(type_id), index: index as u16 });
                    self.heaps.get_or_add_string(&param.name);
                }
            }
            SymbolChange::Updated => {
                self.type_defs.add_updated(type_id)?;
            }
            SymbolChange::ContainsChanges => {}
            SymbolChange::None => return Ok(()),
        }

        for &event_id in &type_def.events {
            let type_row = self.owning_type_row(type_id)?;
            if self.event_map.try_get(type_row).is_none() {
                self.event_map.add(type_row);
            }
            let change = self.changes.classify(Definition::Event(event_id));
            if add_member_if_necessary(&mut self.event_defs, change, event_id)? != MemberAction::Skipped {
                self.heaps.get_or_add_string(&self.module.event(event_id).name);
            }
        }

        for &field_id in &type_def.fields {
            let change = self.changes.classify(Definition::Field(field_id));
            if add_member_if_necessary(&mut self.field_defs, change, field_id)? != MemberAction::Skipped {
                let field = self.module.field(field_id);
                self.heaps.get_or_add_string(&field.name);
                self.heaps.get_or_add_blob(&field.signature);
            }
        }

        for &method_id in &type_def.methods {
            let change = self.changes.classify(Definition::Method(method_id));
            let action = add_member_if_necessary(&mut self.method_defs, change, method_id)?;
            if action == MemberAction::Skipped {
                continue;
            }
            let method = self.module.method(method_id);
            self.heaps.get_or_add_string(&method.name);
            self.heaps.get_or_add_blob(&method.signature);

            if action == MemberAction::Added {
                for param in method.emitted_params() {
                    let key = ParamKey { method: method_id, sequence: param.sequence };
                    self.param_defs.add(key);
                    self.added_params.push(key);
                    self.heaps.get_or_add_string(&param.name);
                }
                for (index, param) in method.generic_params.iter().enumerate() {
                    self.generic_params.add(GenericParamKey {
                        owner: Definition::Method(method_id),
                        index: index as u16,
                    });
                    self.heaps.get_or_add_string(&param.name);
                }
            }
        }

        for &property_id in &type_def.properties {
            let type_row = self.owning_type_row(type_id)?;
            if self.property_map.try_get(type_row).is_none() {
                self.property_map.add(type_row);
            }
            let change = self.changes.classify(Definition::Property(property_id));
            if add_member_if_necessary(&mut self.property_defs, change, property_id)?
                != MemberAction::Skipped
            {
                let property = self.module.property(property_id);
                self.heaps.get_or_add_string(&property.name);
                self.heaps.get_or_add_blob(&property.signature);
            }
        }

        for method_impl in &type_def.method_impls {
            if let Some(method_row) = self.method_defs.try_get(method_impl.implementing) {
                let (key, row) = self.method_impls.add(method_row);
                tracing::trace!(
                    method_row = key.method_row,
                    occurrence = key.occurrence,
                    row,
                    "recorded MethodImpl occurrence"
                );
            }
        }

        for &nested_id in &type_def.nested_types {
            self.create_indices_for_type(nested_id)?;
        }

        Ok(())
    }

    /// `TypeDef` row of a touched type, for keying its `EventMap`/`PropertyMap`
    /// rows. The type is either added in this delta or resolvable from an
    /// earlier generation; anything else is an invariant violation.
    pub(super) fn owning_type_row(&mut self, type_id: TypeId) -> Result<u32> {
        self.type_defs.try_get(type_id).ok_or_else(|| {
            invariant_error!("type {:?} owning touched members does not resolve to a row", type_id)
        })
    }
}
