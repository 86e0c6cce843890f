//! Metadata table identities and per-table size bookkeeping.
//!
//! The delta writer deals with tables at two levels: it assigns row IDs inside
//! the tables it indexes directly, and it reports row-count ranges for the
//! auxiliary tables whose rows the base serializer produces. [`TableId`]
//! carries the ECMA-335 table numbering (which is also the high byte of every
//! [`crate::metadata::token::Token`]), [`FuncCode`] the Edit-and-Continue
//! operation codes recorded in `EncLog`, and [`TableSizes`] a fixed-size
//! row-count vector indexed by table.
//!
//! # Reference
//!
//! - [ECMA-335 II.22](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Metadata table numbering
//! - [ECMA-335 II.22.12](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - `EncLog` operation codes

use std::ops::{Index, IndexMut};

use strum::{EnumCount, EnumIter};

use crate::metadata::token::Token;

/// Identifiers for the metadata tables a delta can touch.
///
/// The numeric values correspond to the table IDs as defined in the CLI
/// specification and double as the table byte of metadata tokens. Tables that
/// can never appear in an EnC delta (file, resource and portable-PDB tables)
/// are omitted; [`TableSizes`] still reserves slots for the full 0x00-0x2C
/// range so indexing stays uniform.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter, EnumCount)]
pub enum TableId {
    /// `Module` table (0x00) - the single row describing the module itself.
    Module = 0x00,
    /// `TypeRef` table (0x01) - references to types in external scopes.
    TypeRef = 0x01,
    /// `TypeDef` table (0x02) - type definitions in this module.
    TypeDef = 0x02,
    /// `Field` table (0x04) - field definitions, owned by `TypeDef` rows.
    Field = 0x04,
    /// `MethodDef` table (0x06) - method definitions, owned by `TypeDef` rows.
    MethodDef = 0x06,
    /// `Param` table (0x08) - parameter rows, owned by `MethodDef` rows.
    Param = 0x08,
    /// `InterfaceImpl` table (0x09) - interface implementations by types.
    InterfaceImpl = 0x09,
    /// `MemberRef` table (0x0A) - references to members of external or constructed types.
    MemberRef = 0x0A,
    /// `Constant` table (0x0B) - compile-time constants of fields, params and properties.
    Constant = 0x0B,
    /// `CustomAttribute` table (0x0C) - custom attribute applications.
    CustomAttribute = 0x0C,
    /// `FieldMarshal` table (0x0D) - marshalling descriptors.
    FieldMarshal = 0x0D,
    /// `DeclSecurity` table (0x0E) - declarative security permission sets.
    DeclSecurity = 0x0E,
    /// `ClassLayout` table (0x0F) - explicit layout for types.
    ClassLayout = 0x0F,
    /// `FieldLayout` table (0x10) - explicit field offsets.
    FieldLayout = 0x10,
    /// `StandAloneSig` table (0x11) - standalone signatures, notably local-variable signatures.
    StandAloneSig = 0x11,
    /// `EventMap` table (0x12) - type-to-event list mapping.
    EventMap = 0x12,
    /// `Event` table (0x14) - event definitions.
    Event = 0x14,
    /// `PropertyMap` table (0x15) - type-to-property list mapping.
    PropertyMap = 0x15,
    /// `Property` table (0x17) - property definitions.
    Property = 0x17,
    /// `MethodSemantics` table (0x18) - accessor associations for events and properties.
    MethodSemantics = 0x18,
    /// `MethodImpl` table (0x19) - explicit interface implementation overrides.
    MethodImpl = 0x19,
    /// `ModuleRef` table (0x1A) - references to external modules.
    ModuleRef = 0x1A,
    /// `TypeSpec` table (0x1B) - signatures of constructed types.
    TypeSpec = 0x1B,
    /// `ImplMap` table (0x1C) - P/Invoke implementation mappings.
    ImplMap = 0x1C,
    /// `FieldRva` table (0x1D) - fields with explicit data addresses.
    FieldRva = 0x1D,
    /// `EncLog` table (0x1E) - the Edit-and-Continue operation log emitted by this writer.
    EncLog = 0x1E,
    /// `EncMap` table (0x1F) - the sorted token map emitted by this writer.
    EncMap = 0x1F,
    /// `Assembly` table (0x20) - the assembly manifest row.
    Assembly = 0x20,
    /// `AssemblyRef` table (0x23) - references to external assemblies.
    AssemblyRef = 0x23,
    /// `NestedClass` table (0x29) - nested type relationships.
    NestedClass = 0x29,
    /// `GenericParam` table (0x2A) - generic parameter definitions.
    GenericParam = 0x2A,
    /// `MethodSpec` table (0x2B) - generic method instantiations.
    MethodSpec = 0x2B,
    /// `GenericParamConstraint` table (0x2C) - constraints on generic parameters.
    GenericParamConstraint = 0x2C,
}

impl TableId {
    /// Builds a token for a 1-based row of this table.
    #[must_use]
    pub fn token(self, row: u32) -> Token {
        Token::from_parts(self, row)
    }
}

/// Edit-and-Continue operation codes recorded in the `FuncCode` column of `EncLog`.
///
/// `Default` marks a row that was written (added or updated) in this delta;
/// the `Add*` codes precede the `Default` row of a newly added child and carry
/// the *owner's* token, telling the runtime which parent list to extend.
/// The numeric values are fixed by the runtime's EnC engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FuncCode {
    /// Row created or updated.
    Default = 0,
    /// A method is being added to the `TypeDef` named by the token.
    AddMethod = 1,
    /// A field is being added to the `TypeDef` named by the token.
    AddField = 2,
    /// A parameter is being added to the `MethodDef` named by the token.
    AddParameter = 3,
    /// A property is being added to the `PropertyMap` row named by the token.
    AddProperty = 4,
    /// An event is being added to the `EventMap` row named by the token.
    AddEvent = 5,
}

/// Number of slots in a [`TableSizes`] vector; covers table codes 0x00-0x2C.
pub const TABLE_SLOT_COUNT: usize = 0x2D;

/// Per-table row counts, indexed by [`TableId`].
///
/// A baseline carries the cumulative counts after its generation; the delta
/// writer produces the counts added by the current generation. Both use this
/// type so that `previous + delta` stays a one-liner.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TableSizes([u32; TABLE_SLOT_COUNT]);

impl TableSizes {
    /// Creates an all-zero size vector.
    #[must_use]
    pub fn new() -> Self {
        Self([0; TABLE_SLOT_COUNT])
    }

    /// Element-wise sum, used when advancing a baseline by one generation.
    #[must_use]
    pub fn adding(&self, delta: &TableSizes) -> TableSizes {
        let mut out = self.clone();
        for (slot, d) in out.0.iter_mut().zip(delta.0.iter()) {
            *slot += d;
        }
        out
    }

    /// Returns true if every slot is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }
}

impl Default for TableSizes {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<TableId> for TableSizes {
    type Output = u32;

    fn index(&self, id: TableId) -> &u32 {
        &self.0[id as usize]
    }
}

impl IndexMut<TableId> for TableSizes {
    fn index_mut(&mut self, id: TableId) -> &mut u32 {
        &mut self.0[id as usize]
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_table_ids_match_ecma_numbering() {
        assert_eq!(TableId::TypeDef as u32, 0x02);
        assert_eq!(TableId::MethodDef as u32, 0x06);
        assert_eq!(TableId::StandAloneSig as u32, 0x11);
        assert_eq!(TableId::EncLog as u32, 0x1E);
        assert_eq!(TableId::EncMap as u32, 0x1F);
        assert_eq!(TableId::GenericParamConstraint as u32, 0x2C);
    }

    #[test]
    fn test_all_table_ids_fit_size_vector() {
        for id in TableId::iter() {
            assert!((id as usize) < TABLE_SLOT_COUNT);
        }
    }

    #[test]
    fn test_func_code_wire_values() {
        assert_eq!(FuncCode::Default as u32, 0);
        assert_eq!(FuncCode::AddMethod as u32, 1);
        assert_eq!(FuncCode::AddField as u32, 2);
        assert_eq!(FuncCode::AddParameter as u32, 3);
        assert_eq!(FuncCode::AddProperty as u32, 4);
        assert_eq!(FuncCode::AddEvent as u32, 5);
    }

    #[test]
    fn test_table_sizes_adding() {
        let mut base = TableSizes::new();
        base[TableId::TypeDef] = 5;
        base[TableId::MethodDef] = 12;

        let mut delta = TableSizes::new();
        delta[TableId::MethodDef] = 1;
        delta[TableId::Param] = 2;

        let merged = base.adding(&delta);
        assert_eq!(merged[TableId::TypeDef], 5);
        assert_eq!(merged[TableId::MethodDef], 13);
        assert_eq!(merged[TableId::Param], 2);
        assert!(!merged.is_empty());
        assert!(TableSizes::new().is_empty());
    }

    #[test]
    fn test_token_helper() {
        assert_eq!(TableId::Param.token(21).value(), 0x08000015);
    }
}
