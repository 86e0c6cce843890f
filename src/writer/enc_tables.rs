//! `EncLog` and `EncMap` construction.
//!
//! The runtime stream-applies a delta by reading `EncLog` front to back, so
//! rows must appear in an order that respects table dependencies. The
//! canonical order is: the reference tables (`AssemblyRef`, `ModuleRef`,
//! `MemberRef`, `MethodSpec`, `TypeRef`, `TypeSpec`, `StandAloneSig`), the
//! touched `TypeDef` rows, the `EventMap`/`PropertyMap` rows, then a
//! structured pass per child table (`Event`, `Field`, `Method`, `Property`)
//! that emits an `Add*` row keyed by the *owner* before each newly added
//! child's `Default` row, the accumulated `(method, parameter)` pairs, and
//! finally the linear auxiliary tables as plain `Default` ranges.
//!
//! `EncMap` is the delta's sorted token directory: one token per touched row,
//! strictly ascending, duplicates asserted away. Reference and auxiliary
//! tables contribute contiguous ranges; definition tables contribute the
//! actual row IDs because updates interleave old IDs among the fresh ones.

use crate::metadata::tables::{FuncCode, TableId, TableSizes};
use crate::metadata::token::Token;
use crate::writer::DeltaMetadataWriter;
use crate::Result;

/// One `EncLog` row: the affected token and the EnC operation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EncLogEntry {
    /// Token of the affected row (for `Add*` operations, the owner's token).
    pub token: Token,
    /// The EnC operation code.
    pub func_code: FuncCode,
}

impl EncLogEntry {
    fn default_row(token: Token) -> Self {
        Self { token, func_code: FuncCode::Default }
    }
}

/// Linear auxiliary tables appended to the log as `Default` ranges, in their
/// canonical order.
const LINEAR_TABLES: [TableId; 13] = [
    TableId::Constant,
    TableId::CustomAttribute,
    TableId::DeclSecurity,
    TableId::ClassLayout,
    TableId::FieldLayout,
    TableId::MethodSemantics,
    TableId::MethodImpl,
    TableId::ImplMap,
    TableId::FieldRva,
    TableId::NestedClass,
    TableId::GenericParam,
    TableId::InterfaceImpl,
    TableId::GenericParamConstraint,
];

/// Reference tables logged (and mapped) as contiguous ranges, in the order
/// `EncLog` emits them.
const REFERENCE_TABLES: [TableId; 7] = [
    TableId::AssemblyRef,
    TableId::ModuleRef,
    TableId::MemberRef,
    TableId::MethodSpec,
    TableId::TypeRef,
    TableId::TypeSpec,
    TableId::StandAloneSig,
];

impl<'a> DeltaMetadataWriter<'a> {
    /// Builds the `EncLog` rows in canonical order.
    pub(super) fn build_enc_log(&mut self, delta_sizes: &TableSizes) -> Result<Vec<EncLogEntry>> {
        let mut log = Vec::new();

        for table in REFERENCE_TABLES {
            self.push_token_range(&mut log, table, delta_sizes[table]);
        }

        for row in self.type_defs.rows().to_vec() {
            log.push(EncLogEntry::default_row(TableId::TypeDef.token(row.row_id)));
        }

        let event_map_rows: Vec<(u32, u32)> = self.event_map.rows().collect();
        for (map_row, _) in &event_map_rows {
            log.push(EncLogEntry::default_row(TableId::EventMap.token(*map_row)));
        }
        let property_map_rows: Vec<(u32, u32)> = self.property_map.rows().collect();
        for (map_row, _) in &property_map_rows {
            log.push(EncLogEntry::default_row(TableId::PropertyMap.token(*map_row)));
        }

        // Structured child passes: an Add* row keyed by the owner precedes the
        // Default row of each newly added child; updated children emit only
        // their Default row.
        for row in self.event_defs.rows().to_vec() {
            if self.event_defs.is_added_not_changed(row.item) {
                let owner = self.module.event(row.item).owner;
                let map_row = self.member_map_row_for(owner, TableId::EventMap)?;
                log.push(EncLogEntry {
                    token: TableId::EventMap.token(map_row),
                    func_code: FuncCode::AddEvent,
                });
            }
            log.push(EncLogEntry::default_row(TableId::Event.token(row.row_id)));
        }

        for row in self.field_defs.rows().to_vec() {
            if self.field_defs.is_added_not_changed(row.item) {
                let owner = self.module.field(row.item).owner;
                let type_row = self.owning_type_row(owner)?;
                log.push(EncLogEntry {
                    token: TableId::TypeDef.token(type_row),
                    func_code: FuncCode::AddField,
                });
            }
            log.push(EncLogEntry::default_row(TableId::Field.token(row.row_id)));
        }

        for row in self.method_defs.rows().to_vec() {
            if self.method_defs.is_added_not_changed(row.item) {
                let owner = self.module.method(row.item).owner;
                let type_row = self.owning_type_row(owner)?;
                log.push(EncLogEntry {
                    token: TableId::TypeDef.token(type_row),
                    func_code: FuncCode::AddMethod,
                });
            }
            log.push(EncLogEntry::default_row(TableId::MethodDef.token(row.row_id)));
        }

        for row in self.property_defs.rows().to_vec() {
            if self.property_defs.is_added_not_changed(row.item) {
                let owner = self.module.property(row.item).owner;
                let map_row = self.member_map_row_for(owner, TableId::PropertyMap)?;
                log.push(EncLogEntry {
                    token: TableId::PropertyMap.token(map_row),
                    func_code: FuncCode::AddProperty,
                });
            }
            log.push(EncLogEntry::default_row(TableId::Property.token(row.row_id)));
        }

        // Parameters, in the order the driver accumulated them.
        for key in self.added_params.clone() {
            let method_row = self.method_defs.try_get(key.method).ok_or_else(|| {
                invariant_error!("method of added parameter {:?} does not resolve to a row", key)
            })?;
            let param_row = self
                .param_defs
                .get(key)
                .ok_or_else(|| invariant_error!("added parameter {:?} has no row", key))?;
            log.push(EncLogEntry {
                token: TableId::MethodDef.token(method_row),
                func_code: FuncCode::AddParameter,
            });
            log.push(EncLogEntry::default_row(TableId::Param.token(param_row)));
        }

        for table in LINEAR_TABLES {
            self.push_token_range(&mut log, table, delta_sizes[table]);
        }

        Ok(log)
    }

    /// Builds the `EncMap` token list: every token touched by this delta,
    /// sorted ascending.
    pub(super) fn build_enc_map(&mut self, delta_sizes: &TableSizes) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        // Definition tables interleave pre-existing IDs (updates) with fresh
        // ones, so the actual touched rows are listed.
        tokens.extend(self.type_defs.rows().iter().map(|r| TableId::TypeDef.token(r.row_id)));
        tokens.extend(self.field_defs.rows().iter().map(|r| TableId::Field.token(r.row_id)));
        tokens.extend(self.method_defs.rows().iter().map(|r| TableId::MethodDef.token(r.row_id)));
        tokens.extend(self.event_defs.rows().iter().map(|r| TableId::Event.token(r.row_id)));
        tokens.extend(self.property_defs.rows().iter().map(|r| TableId::Property.token(r.row_id)));
        tokens.extend(self.param_defs.rows().map(|(_, row)| TableId::Param.token(row)));

        // Everything else is a pure-addition range above the baseline size.
        for table in REFERENCE_TABLES {
            Self::extend_token_range(&mut tokens, table, self.baseline.table_sizes[table], delta_sizes[table]);
        }
        for table in [TableId::EventMap, TableId::PropertyMap] {
            Self::extend_token_range(&mut tokens, table, self.baseline.table_sizes[table], delta_sizes[table]);
        }
        for table in LINEAR_TABLES {
            Self::extend_token_range(&mut tokens, table, self.baseline.table_sizes[table], delta_sizes[table]);
        }

        tokens.sort();
        assert!(
            tokens.windows(2).all(|pair| pair[0] < pair[1]),
            "EncMap contains duplicate tokens"
        );
        Ok(tokens)
    }

    fn push_token_range(&self, log: &mut Vec<EncLogEntry>, table: TableId, count: u32) {
        let previous = self.baseline.table_sizes[table];
        for offset in 1..=count {
            log.push(EncLogEntry::default_row(table.token(previous + offset)));
        }
    }

    fn extend_token_range(tokens: &mut Vec<Token>, table: TableId, previous: u32, count: u32) {
        tokens.extend((1..=count).map(|offset| table.token(previous + offset)));
    }

    /// `EventMap`/`PropertyMap` row of the type owning a touched child.
    fn member_map_row_for(&mut self, owner: crate::model::TypeId, table: TableId) -> Result<u32> {
        let type_row = self.owning_type_row(owner)?;
        let map = match table {
            TableId::EventMap => &self.event_map,
            TableId::PropertyMap => &self.property_map,
            _ => unreachable!("not a member map table"),
        };
        map.try_get(type_row).ok_or_else(|| {
            invariant_error!("type row {} has no {:?} row for its touched children", type_row, table)
        })
    }
}
