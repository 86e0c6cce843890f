//! Token resolution and type-signature serialization against the live indices.
//!
//! Serializing a type is not a pure function of the type: a class target must
//! resolve to a `TypeDef` row (possibly assigned earlier in this same delta),
//! a named external type interns a `TypeRef` row, and a constructed type used
//! where a token is required interns a `TypeSpec` row whose blob is produced
//! by this very serializer. These methods therefore live on the writer, where
//! the indices and heaps are in reach.

use crate::index::reference::{MemberRefValue, MethodSpecValue, TypeRefValue, TypeSpecValue};
use crate::metadata::signatures::{
    type_def_or_ref_coded_index, write_compressed_uint, ELEMENT_TYPE, SIGNATURE_HEADER,
};
use crate::metadata::tables::TableId;
use crate::metadata::token::Token;
use crate::model::refs::{
    MemberRefTarget, MethodInstantiation, MethodTarget, RefScope, TypeRefName, TypeSignature,
    TypeTarget,
};
use crate::writer::DeltaMetadataWriter;
use crate::Result;

impl<'a> DeltaMetadataWriter<'a> {
    /// Resolves a type target to a token, interning `TypeRef`/`TypeSpec` rows
    /// as needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Invariant`] when a definition target does not
    /// resolve to a row in any generation - a type a delta refers to must be
    /// added by the delta or already exist.
    pub(super) fn type_target_token(&mut self, target: &TypeTarget) -> Result<Token> {
        match target {
            TypeTarget::Definition(type_id) => {
                let row = self.type_defs.try_get(*type_id).ok_or_else(|| {
                    invariant_error!("referenced type {:?} does not resolve to a row", type_id)
                })?;
                Ok(TableId::TypeDef.token(row))
            }
            TypeTarget::Reference(name) => self.type_ref_token(name),
            TypeTarget::Specification(signature) => {
                let mut blob = Vec::new();
                self.serialize_type_signature(signature, &mut blob)?;
                self.heaps.get_or_add_blob(&blob);
                let row = self.type_specs.get_or_add(TypeSpecValue { signature: blob });
                Ok(TableId::TypeSpec.token(row))
            }
        }
    }

    fn type_ref_token(&mut self, name: &TypeRefName) -> Result<Token> {
        let scope = self.ref_scope_token(&name.scope)?;
        self.heaps.get_or_add_string(&name.namespace);
        self.heaps.get_or_add_string(&name.name);
        let row = self.type_refs.get_or_add(TypeRefValue {
            scope,
            namespace: name.namespace.clone(),
            name: name.name.clone(),
            resolves_to: name.resolves_to,
        });
        Ok(TableId::TypeRef.token(row))
    }

    fn ref_scope_token(&mut self, scope: &RefScope) -> Result<Token> {
        match scope {
            RefScope::Assembly(assembly) => {
                self.heaps.get_or_add_string(&assembly.name);
                self.heaps.get_or_add_string(&assembly.culture);
                let row = self.assembly_refs.get_or_add(assembly.clone());
                Ok(TableId::AssemblyRef.token(row))
            }
            RefScope::Module(module) => {
                self.heaps.get_or_add_string(&module.name);
                let row = self.module_refs.get_or_add(module.clone());
                Ok(TableId::ModuleRef.token(row))
            }
            RefScope::Nested(enclosing) => self.type_ref_token(enclosing),
        }
    }

    /// Resolves a method target to a `MethodDef` or `MemberRef` token.
    pub(super) fn method_target_token(&mut self, target: &MethodTarget) -> Result<Token> {
        match target {
            MethodTarget::Definition(method_id) => {
                let row = self.method_defs.try_get(*method_id).ok_or_else(|| {
                    invariant_error!("referenced method {:?} does not resolve to a row", method_id)
                })?;
                Ok(TableId::MethodDef.token(row))
            }
            MethodTarget::Reference(member) => {
                let row = self.member_ref_row(member)?;
                Ok(TableId::MemberRef.token(row))
            }
        }
    }

    /// Interns a `MemberRef` row for a member target.
    pub(super) fn member_ref_row(&mut self, target: &MemberRefTarget) -> Result<u32> {
        let parent = self.type_target_token(&target.parent)?;
        self.heaps.get_or_add_string(&target.name);
        self.heaps.get_or_add_blob(&target.signature);
        Ok(self.member_refs.get_or_add(MemberRefValue {
            parent,
            name: target.name.clone(),
            signature: target.signature.clone(),
            resolves_to: target.resolves_to,
        }))
    }

    /// Interns a `MethodSpec` row for a generic method instantiation.
    pub(super) fn method_spec_row(&mut self, instantiation: &MethodInstantiation) -> Result<u32> {
        let method = self.method_target_token(&instantiation.method)?;
        let mut blob = Vec::new();
        blob.push(SIGNATURE_HEADER::GENERIC_INST);
        write_compressed_uint(instantiation.type_args.len() as u32, &mut blob);
        for arg in &instantiation.type_args {
            self.serialize_type_signature(arg, &mut blob)?;
        }
        self.heaps.get_or_add_blob(&blob);
        Ok(self.method_specs.get_or_add(MethodSpecValue { method, instantiation: blob }))
    }

    /// Serializes a type signature, interning any rows its targets require.
    pub(super) fn serialize_type_signature(
        &mut self,
        signature: &TypeSignature,
        buffer: &mut Vec<u8>,
    ) -> Result<()> {
        match signature {
            TypeSignature::Boolean => buffer.push(ELEMENT_TYPE::BOOLEAN),
            TypeSignature::Char => buffer.push(ELEMENT_TYPE::CHAR),
            TypeSignature::SByte => buffer.push(ELEMENT_TYPE::I1),
            TypeSignature::Byte => buffer.push(ELEMENT_TYPE::U1),
            TypeSignature::Int16 => buffer.push(ELEMENT_TYPE::I2),
            TypeSignature::UInt16 => buffer.push(ELEMENT_TYPE::U2),
            TypeSignature::Int32 => buffer.push(ELEMENT_TYPE::I4),
            TypeSignature::UInt32 => buffer.push(ELEMENT_TYPE::U4),
            TypeSignature::Int64 => buffer.push(ELEMENT_TYPE::I8),
            TypeSignature::UInt64 => buffer.push(ELEMENT_TYPE::U8),
            TypeSignature::Single => buffer.push(ELEMENT_TYPE::R4),
            TypeSignature::Double => buffer.push(ELEMENT_TYPE::R8),
            TypeSignature::IntPtr => buffer.push(ELEMENT_TYPE::I),
            TypeSignature::UIntPtr => buffer.push(ELEMENT_TYPE::U),
            TypeSignature::Object => buffer.push(ELEMENT_TYPE::OBJECT),
            TypeSignature::String => buffer.push(ELEMENT_TYPE::STRING),
            TypeSignature::Class(target) => {
                buffer.push(ELEMENT_TYPE::CLASS);
                let token = self.type_target_token(target)?;
                write_compressed_uint(type_def_or_ref_coded_index(token)?, buffer);
            }
            TypeSignature::ValueType(target) => {
                buffer.push(ELEMENT_TYPE::VALUETYPE);
                let token = self.type_target_token(target)?;
                write_compressed_uint(type_def_or_ref_coded_index(token)?, buffer);
            }
            TypeSignature::SzArray(element) => {
                buffer.push(ELEMENT_TYPE::SZARRAY);
                self.serialize_type_signature(element, buffer)?;
            }
            TypeSignature::Pointer(pointee) => {
                buffer.push(ELEMENT_TYPE::PTR);
                self.serialize_type_signature(pointee, buffer)?;
            }
            TypeSignature::GenericInstance { generic, value_type, args } => {
                buffer.push(ELEMENT_TYPE::GENERICINST);
                buffer.push(if *value_type { ELEMENT_TYPE::VALUETYPE } else { ELEMENT_TYPE::CLASS });
                let token = self.type_target_token(generic)?;
                write_compressed_uint(type_def_or_ref_coded_index(token)?, buffer);
                write_compressed_uint(args.len() as u32, buffer);
                for arg in args {
                    self.serialize_type_signature(arg, buffer)?;
                }
            }
            TypeSignature::GenericTypeParameter(number) => {
                buffer.push(ELEMENT_TYPE::VAR);
                write_compressed_uint(*number, buffer);
            }
            TypeSignature::GenericMethodParameter(number) => {
                buffer.push(ELEMENT_TYPE::MVAR);
                write_compressed_uint(*number, buffer);
            }
        }
        Ok(())
    }
}
