//! The reference visitor and the post-freeze added-symbol sweep.
//!
//! The visitor is a structural traversal pruned by the change oracle: it
//! walks the same changed-type set as the driver but collects the *references*
//! of every touched definition - type occurrences, member references, generic
//! method instantiations and user strings - populating the content-addressed
//! reference indices as a side effect. Subtrees whose classification is
//! `None` are skipped entirely, and the references of a method-implementation
//! declaration are revisited only when the implementing method is itself a
//! new addition; older `MethodImpl` rows keep referring to rows that already
//! exist in the baseline.
//!
//! Locals whose signatures were carried over pre-serialized contribute no
//! reference visits: their blobs are appended verbatim by the local-signature
//! serializer, and every row such a blob mentions already exists in the
//! generation that first serialized it.
//!
//! After the indices freeze, the sweep walks the frozen `TypeRef` and
//! `MemberRef` rows and reports a diagnostic for every reference that lands
//! on a symbol this same delta adds - the runtime cannot resolve such a
//! reference until the delta is applied.

use crate::diagnostics::Diagnostic;
use crate::model::changes::SymbolChange;
use crate::model::refs::ReferencedEntity;
use crate::model::{Definition, TypeId};
use crate::writer::DeltaMetadataWriter;
use crate::Result;

impl<'a> DeltaMetadataWriter<'a> {
    /// Phase 2: populate the reference indices from the touched definitions.
    pub(super) fn visit_references(&mut self) -> Result<()> {
        let changed: Vec<TypeId> = self.changes.changed_types().to_vec();
        for type_id in changed {
            self.cancel.check()?;
            self.visit_type_references(type_id)?;
        }
        Ok(())
    }

    fn visit_type_references(&mut self, type_id: TypeId) -> Result<()> {
        let change = self.changes.classify(Definition::Type(type_id));
        if change == SymbolChange::None {
            return Ok(());
        }

        let type_def = self.module.type_def(type_id);
        if matches!(change, SymbolChange::Added | SymbolChange::Updated) {
            self.visit_entities(&type_def.references)?;
        }

        for &field_id in &type_def.fields {
            if self.is_touched(Definition::Field(field_id)) {
                self.visit_entities(&self.module.field(field_id).references)?;
            }
        }

        for &method_id in &type_def.methods {
            if self.is_touched(Definition::Method(method_id)) {
                let method = self.module.method(method_id);
                self.visit_entities(&method.references)?;
                if let Some(body) = &method.body {
                    self.visit_entities(&body.references)?;
                }
            }
        }

        for &event_id in &type_def.events {
            if self.is_touched(Definition::Event(event_id)) {
                self.visit_entities(&self.module.event(event_id).references)?;
            }
        }

        for &property_id in &type_def.properties {
            if self.is_touched(Definition::Property(property_id)) {
                self.visit_entities(&self.module.property(property_id).references)?;
            }
        }

        // Implementation references are revisited only for newly added
        // implementing methods; earlier rows persist by reference.
        for method_impl in &type_def.method_impls {
            if self.method_defs.is_added_not_changed(method_impl.implementing) {
                self.method_target_token(&method_impl.declaration)?;
            }
        }

        for &nested_id in &type_def.nested_types {
            self.visit_type_references(nested_id)?;
        }

        Ok(())
    }

    /// A definition entered by the visitor is never classified `None`; the
    /// walk is pruned above it.
    fn is_touched(&self, def: Definition) -> bool {
        !matches!(self.changes.classify(def), SymbolChange::None)
    }

    fn visit_entities(&mut self, entities: &[ReferencedEntity]) -> Result<()> {
        for entity in entities {
            match entity {
                ReferencedEntity::Type(target) => {
                    self.type_target_token(target)?;
                }
                ReferencedEntity::Member(target) => {
                    self.member_ref_row(target)?;
                }
                ReferencedEntity::MethodInstantiation(instantiation) => {
                    self.method_spec_row(instantiation)?;
                }
                ReferencedEntity::UserString(literal) => {
                    self.heaps.get_or_add_user_string(literal);
                }
            }
        }
        Ok(())
    }

    /// Post-freeze sweep: report every reference to a symbol added in this
    /// same delta.
    pub(super) fn report_references_to_added_symbols(&mut self) {
        let mut found = Vec::new();

        for (value, _) in self.type_refs.rows() {
            if let Some(type_id) = value.resolves_to {
                if self.changes.is_added(Definition::Type(type_id)) {
                    found.push(Diagnostic::reference_to_added_member(
                        self.module.type_def(type_id).name.clone(),
                        self.module.assembly_name.clone(),
                    ));
                }
            }
        }

        for (value, _) in self.member_refs.rows() {
            if let Some(def) = value.resolves_to {
                if self.changes.is_added(def) {
                    found.push(Diagnostic::reference_to_added_member(
                        self.definition_name(def),
                        self.module.assembly_name.clone(),
                    ));
                }
            }
        }

        self.diagnostics.extend(found);
    }

    fn definition_name(&self, def: Definition) -> String {
        match def {
            Definition::Type(id) => self.module.type_def(id).name.clone(),
            Definition::Method(id) => self.module.method(id).name.clone(),
            Definition::Field(id) => self.module.field(id).name.clone(),
            Definition::Event(id) => self.module.event(id).name.clone(),
            Definition::Property(id) => self.module.property(id).name.clone(),
        }
    }
}
