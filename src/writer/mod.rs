//! The delta metadata writer.
//!
//! [`DeltaMetadataWriter`] orchestrates one delta emission over a fixed phase
//! sequence: create indices and drive the change set, visit references,
//! serialize method-body local signatures, freeze the reference indices,
//! sweep for references to added symbols, compute delta table sizes, build
//! `EncLog`, build `EncMap`, hand the frozen view to the base serializer, and
//! finally merge the next baseline. Reordering any of these phases invalidates
//! row IDs, which is why the sequence lives in exactly one place
//! ([`DeltaMetadataWriter::emit`]) and the indices panic on post-freeze
//! mutation.
//!
//! A writer instance is used by one caller from construction to `emit` and
//! then discarded; nothing suspends, nothing locks. Cancellation is polled
//! between phases and between top-level types.
//!
//! # Key Components
//!
//! - [`DeltaMetadataWriter`] - the orchestrator
//! - [`EncDelta`] - everything one emission produces
//! - [`DeltaSink`] / [`DeltaView`] - the seam to the base metadata serializer
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use cildelta::prelude::*;
//!
//! let writer = DeltaMetadataWriter::new(
//!     &module, &baseline, &changes, &definition_map,
//!     EmitOptions::default(), CancellationToken::new(),
//! );
//! let delta = writer.emit(fresh_enc_id, &mut sink)?;
//! apply_to_debuggee(&delta);
//! let baseline = delta.next_baseline; // feed into the next edit
//! # Ok::<(), cildelta::Error>(())
//! ```

mod driver;
mod enc_tables;
mod locals;
mod references;
mod signatures;

pub use enc_tables::EncLogEntry;
pub use locals::{BlobPool, PooledBlob};

use rustc_hash::FxHashMap;

use crate::baseline::{BaselineDelta, EmitBaseline};
use crate::cancellation::CancellationToken;
use crate::diagnostics::Diagnostic;
use crate::index::definition::{DefinitionIndex, GenericParameterIndex, ParameterIndex};
use crate::index::member_map::{MemberMapIndex, MethodImplIndex};
use crate::index::reference::{
    AssemblyRefIndex, MemberRefValue, MethodSpecValue, ModuleRefIndex, ReferenceIndex,
    StandAloneSigValue, TypeRefValue, TypeSpecValue,
};
use crate::metadata::guid::Guid;
use crate::metadata::heaps::DeltaHeaps;
use crate::metadata::tables::{TableId, TableSizes};
use crate::metadata::token::Token;
use crate::model::changes::{ChangeOracle, DefinitionMap};
use crate::model::debug_info::MethodDebugInfo;
use crate::model::{EventId, FieldId, MethodId, ModuleModel, ParamKey, PropertyId, TypeId};
use crate::options::EmitOptions;
use crate::Result;

/// Produces one incremental metadata delta from a frozen baseline, a change
/// oracle and a definition map.
pub struct DeltaMetadataWriter<'a> {
    module: &'a ModuleModel,
    baseline: &'a EmitBaseline,
    changes: &'a dyn ChangeOracle,
    options: EmitOptions,
    cancel: CancellationToken,

    type_defs: DefinitionIndex<'a, TypeId>,
    method_defs: DefinitionIndex<'a, MethodId>,
    field_defs: DefinitionIndex<'a, FieldId>,
    event_defs: DefinitionIndex<'a, EventId>,
    property_defs: DefinitionIndex<'a, PropertyId>,
    param_defs: ParameterIndex,
    generic_params: GenericParameterIndex,
    event_map: MemberMapIndex<'a>,
    property_map: MemberMapIndex<'a>,
    method_impls: MethodImplIndex<'a>,

    assembly_refs: AssemblyRefIndex,
    module_refs: ModuleRefIndex,
    type_refs: ReferenceIndex<TypeRefValue>,
    type_specs: ReferenceIndex<TypeSpecValue>,
    member_refs: ReferenceIndex<MemberRefValue>,
    method_specs: ReferenceIndex<MethodSpecValue>,
    standalone_sigs: ReferenceIndex<StandAloneSigValue>,

    heaps: DeltaHeaps,
    blob_pool: BlobPool,

    /// `(method, parameter)` additions in emission order, for the `EncLog`.
    added_params: Vec<ParamKey>,
    added_or_changed_methods: FxHashMap<u32, MethodDebugInfo>,
    local_signatures: FxHashMap<u32, Token>,
    updated_methods: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> DeltaMetadataWriter<'a> {
    /// Creates a writer whose indices continue the baseline's numbering.
    #[must_use]
    pub fn new(
        module: &'a ModuleModel,
        baseline: &'a EmitBaseline,
        changes: &'a dyn ChangeOracle,
        definition_map: &'a dyn DefinitionMap,
        options: EmitOptions,
        cancel: CancellationToken,
    ) -> Self {
        let sizes = &baseline.table_sizes;
        Self {
            module,
            baseline,
            changes,
            options,
            cancel,
            type_defs: DefinitionIndex::new(sizes[TableId::TypeDef], &baseline.types_added, definition_map),
            method_defs: DefinitionIndex::new(sizes[TableId::MethodDef], &baseline.methods_added, definition_map),
            field_defs: DefinitionIndex::new(sizes[TableId::Field], &baseline.fields_added, definition_map),
            event_defs: DefinitionIndex::new(sizes[TableId::Event], &baseline.events_added, definition_map),
            property_defs: DefinitionIndex::new(sizes[TableId::Property], &baseline.properties_added, definition_map),
            param_defs: ParameterIndex::new(sizes[TableId::Param]),
            generic_params: GenericParameterIndex::new(sizes[TableId::GenericParam]),
            event_map: MemberMapIndex::new(
                sizes[TableId::EventMap],
                &baseline.event_map_added,
                &baseline.type_event_rows,
            ),
            property_map: MemberMapIndex::new(
                sizes[TableId::PropertyMap],
                &baseline.property_map_added,
                &baseline.type_property_rows,
            ),
            method_impls: MethodImplIndex::new(sizes[TableId::MethodImpl], &baseline.method_impls),
            assembly_refs: AssemblyRefIndex::new(sizes[TableId::AssemblyRef]),
            module_refs: ModuleRefIndex::new(sizes[TableId::ModuleRef]),
            type_refs: ReferenceIndex::new(sizes[TableId::TypeRef]),
            type_specs: ReferenceIndex::new(sizes[TableId::TypeSpec]),
            member_refs: ReferenceIndex::new(sizes[TableId::MemberRef]),
            method_specs: ReferenceIndex::new(sizes[TableId::MethodSpec]),
            standalone_sigs: ReferenceIndex::new(sizes[TableId::StandAloneSig]),
            heaps: DeltaHeaps::new(baseline.heap_lengths),
            blob_pool: BlobPool::new(),
            added_params: Vec::new(),
            added_or_changed_methods: FxHashMap::default(),
            local_signatures: FxHashMap::default(),
            updated_methods: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// The generation this writer emits (`baseline.ordinal + 1`).
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.baseline.ordinal + 1
    }

    /// Runs the fixed emission sequence and produces the delta.
    ///
    /// `enc_id` must be a fresh GUID distinct from the baseline's `enc_id` and
    /// `enc_base_id`; it is the only non-deterministic input, and the caller
    /// supplies it so that identical inputs produce identical bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] when the cancellation token fires
    /// at a safe point, and [`crate::Error::Invariant`] for any violated
    /// structural invariant. In both cases no baseline is produced.
    pub fn emit(mut self, enc_id: Guid, sink: &mut dyn DeltaSink) -> Result<EncDelta> {
        if self.options.compress_metadata_stream {
            return Err(invariant_error!("deltas never compress the metadata stream"));
        }
        if enc_id.is_zero() || enc_id == self.baseline.enc_id || enc_id == self.baseline.enc_base_id {
            return Err(invariant_error!(
                "enc_id {} is not fresh with respect to the baseline",
                enc_id
            ));
        }

        // The generation GUID pair is the delta's whole #GUID contribution.
        self.heaps.add_guid(enc_id);
        self.heaps.add_guid(self.baseline.enc_id);

        tracing::debug!(generation = self.generation(), "driving symbol changes");
        self.cancel.check()?;
        self.drive_changes()?;

        tracing::debug!("visiting references");
        self.cancel.check()?;
        self.visit_references()?;

        tracing::debug!("serializing method body local signatures");
        self.cancel.check()?;
        self.serialize_method_bodies()?;

        self.freeze_reference_indices();
        self.report_references_to_added_symbols();

        self.cancel.check()?;
        let delta_sizes = self.compute_delta_sizes();
        let enc_log = self.build_enc_log(&delta_sizes)?;
        let enc_map = self.build_enc_map(&delta_sizes)?;
        tracing::debug!(
            enc_log_rows = enc_log.len(),
            enc_map_tokens = enc_map.len(),
            "built EnC tables"
        );

        sink.commit(&DeltaView {
            delta_sizes: &delta_sizes,
            enc_log: &enc_log,
            enc_map: &enc_map,
            heaps: &self.heaps,
            local_signatures: &self.local_signatures,
        })?;

        let next_baseline = self.baseline.advance(self.baseline_delta(enc_id, delta_sizes.clone()));

        Ok(EncDelta {
            next_baseline,
            delta_sizes,
            enc_log,
            enc_map,
            string_heap: self.heaps.string_stream().to_vec(),
            user_string_heap: self.heaps.user_string_stream(),
            blob_heap: self.heaps.blob_stream(),
            guid_heap: self.heaps.guid_stream(),
            local_signatures: self.local_signatures,
            updated_methods: self.updated_methods,
            diagnostics: self.diagnostics,
        })
    }

    /// Delta row counts per table: reference indices contribute their row
    /// counts, definition indices their *addition* counts (updates do not
    /// grow a table), and the auxiliary tables the counts the module model
    /// reports for the base serializer's rows.
    fn compute_delta_sizes(&self) -> TableSizes {
        let aux = &self.module.aux_row_counts;
        let mut sizes = TableSizes::new();
        sizes[TableId::TypeDef] = self.type_defs.added_count();
        sizes[TableId::Field] = self.field_defs.added_count();
        sizes[TableId::MethodDef] = self.method_defs.added_count();
        sizes[TableId::Param] = self.param_defs.count();
        sizes[TableId::Event] = self.event_defs.added_count();
        sizes[TableId::Property] = self.property_defs.added_count();
        sizes[TableId::EventMap] = self.event_map.added_count();
        sizes[TableId::PropertyMap] = self.property_map.added_count();
        sizes[TableId::GenericParam] = self.generic_params.count();
        sizes[TableId::MethodImpl] = self.method_impls.added_count();
        sizes[TableId::AssemblyRef] = self.assembly_refs.count();
        sizes[TableId::ModuleRef] = self.module_refs.count();
        sizes[TableId::TypeRef] = self.type_refs.count();
        sizes[TableId::TypeSpec] = self.type_specs.count();
        sizes[TableId::MemberRef] = self.member_refs.count();
        sizes[TableId::MethodSpec] = self.method_specs.count();
        sizes[TableId::StandAloneSig] = self.standalone_sigs.count();
        sizes[TableId::Constant] = aux.constant;
        sizes[TableId::CustomAttribute] = aux.custom_attribute;
        sizes[TableId::DeclSecurity] = aux.decl_security;
        sizes[TableId::ClassLayout] = aux.class_layout;
        sizes[TableId::FieldLayout] = aux.field_layout;
        sizes[TableId::MethodSemantics] = aux.method_semantics;
        sizes[TableId::ImplMap] = aux.impl_map;
        sizes[TableId::FieldRva] = aux.field_rva;
        sizes[TableId::NestedClass] = aux.nested_class;
        sizes[TableId::InterfaceImpl] = aux.interface_impl;
        sizes[TableId::GenericParamConstraint] = aux.generic_param_constraint;
        sizes
    }

    fn freeze_reference_indices(&mut self) {
        self.assembly_refs.freeze();
        self.module_refs.freeze();
        self.type_refs.freeze();
        self.type_specs.freeze();
        self.member_refs.freeze();
        self.method_specs.freeze();
        self.standalone_sigs.freeze();
    }

    fn baseline_delta(&self, enc_id: Guid, table_sizes: TableSizes) -> BaselineDelta {
        BaselineDelta {
            enc_id,
            table_sizes,
            heap_lengths: self.heaps.merged_lengths(),
            types_added: self.type_defs.added_entries().collect(),
            methods_added: self.method_defs.added_entries().collect(),
            fields_added: self.field_defs.added_entries().collect(),
            events_added: self.event_defs.added_entries().collect(),
            properties_added: self.property_defs.added_entries().collect(),
            event_map_added: self.event_map.added_map(),
            property_map_added: self.property_map.added_map(),
            method_impls: self.method_impls.added_entries().collect(),
            added_or_changed_methods: self.added_or_changed_methods.clone(),
            anonymous_types: self.module.anonymous_types.clone(),
            synthesized_members: self.module.synthesized_members.clone(),
        }
    }
}

/// The seam to the base metadata serializer.
///
/// The base writer owns row-byte production and the physical `#-` stream
/// layout; the delta writer hands it a frozen, read-only view after the EnC
/// tables are built and before the baseline advances. A test double that
/// records the view is sufficient to validate the handoff.
pub trait DeltaSink {
    /// Receives the frozen delta exactly once per emission.
    ///
    /// # Errors
    ///
    /// Any error aborts emission; no baseline is produced.
    fn commit(&mut self, view: &DeltaView<'_>) -> Result<()>;
}

/// Read-only view of a finished delta, as handed to the [`DeltaSink`].
pub struct DeltaView<'w> {
    /// Rows added per table by this delta.
    pub delta_sizes: &'w TableSizes,
    /// `EncLog` rows in canonical order.
    pub enc_log: &'w [EncLogEntry],
    /// `EncMap` tokens, sorted ascending.
    pub enc_map: &'w [Token],
    /// The delta's heap additions.
    pub heaps: &'w DeltaHeaps,
    /// Local-signature token per emitted method row.
    pub local_signatures: &'w FxHashMap<u32, Token>,
}

/// A [`DeltaSink`] that ignores the handoff, for hosts that consume the
/// structured [`EncDelta`] directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DeltaSink for NullSink {
    fn commit(&mut self, _view: &DeltaView<'_>) -> Result<()> {
        Ok(())
    }
}

/// Everything one delta emission produces.
#[derive(Debug)]
pub struct EncDelta {
    /// The baseline to use for the next generation.
    pub next_baseline: EmitBaseline,
    /// Rows added per table by this delta.
    pub delta_sizes: TableSizes,
    /// `EncLog` rows in canonical order.
    pub enc_log: Vec<EncLogEntry>,
    /// `EncMap` tokens, sorted ascending.
    pub enc_map: Vec<Token>,
    /// This delta's `#Strings` additions.
    pub string_heap: Vec<u8>,
    /// This delta's `#US` additions, zero-padded to 4-byte alignment.
    pub user_string_heap: Vec<u8>,
    /// This delta's `#Blob` additions, zero-padded to 4-byte alignment.
    pub blob_heap: Vec<u8>,
    /// This delta's `#GUID` additions.
    pub guid_heap: Vec<u8>,
    /// Local-signature token per emitted method row.
    pub local_signatures: FxHashMap<u32, Token>,
    /// Tokens of methods whose bodies changed and retained sequence points;
    /// the set the debugger will attempt to remap.
    pub updated_methods: Vec<Token>,
    /// Findings recorded during emission (references to added symbols).
    pub diagnostics: Vec<Diagnostic>,
}
