//! Reference targets and type signatures.
//!
//! Everything a lowered body or signature can point at is described by the
//! value types here. They are plain data with structural equality, which is
//! what lets the reference indices deduplicate by content: two occurrences of
//! the same constructed type or the same external member collapse into one
//! row regardless of where they were encountered.
//!
//! A reference that semantically lands on a definition in the module being
//! edited records that resolution (`resolves_to`), so the post-freeze sweep
//! can flag references to symbols added in the same delta.

use crate::model::{Definition, MethodId, TypeId};

/// A reference to an external assembly, compared nominally.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssemblyReference {
    /// Simple assembly name.
    pub name: String,
    /// Version quadruple (major, minor, build, revision).
    pub version: (u16, u16, u16, u16),
    /// Culture string, empty for neutral.
    pub culture: String,
    /// Public key token, if the assembly is strong-named.
    pub public_key_token: Option<[u8; 8]>,
}

impl AssemblyReference {
    /// Creates a versionless, culture-neutral reference - enough for tests
    /// and for references into the unversioned core library.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: (0, 0, 0, 0),
            culture: String::new(),
            public_key_token: None,
        }
    }
}

/// A reference to an external module of the current assembly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleReference {
    /// Module file name.
    pub name: String,
}

/// Resolution scope of a named type reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RefScope {
    /// The type lives in an external assembly.
    Assembly(AssemblyReference),
    /// The type lives in another module of this assembly.
    Module(ModuleReference),
    /// The type is nested in another referenced type.
    Nested(Box<TypeRefName>),
}

/// A named type reference (`TypeRef` row shape).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeRefName {
    /// Where the type resolves.
    pub scope: RefScope,
    /// Namespace, empty for nested types.
    pub namespace: String,
    /// Simple name.
    pub name: String,
    /// Set when the reference lands on a type defined in the module being
    /// edited (e.g. a reference from another edited symbol).
    pub resolves_to: Option<TypeId>,
}

/// The target of a type occurrence in a signature or body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeTarget {
    /// A type defined in the module being edited.
    Definition(TypeId),
    /// A named external type.
    Reference(TypeRefName),
    /// A constructed type that needs a `TypeSpec` row when used as a token.
    Specification(Box<TypeSignature>),
}

/// A member reference (`MemberRef` row shape), compared structurally.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberRefTarget {
    /// The containing type.
    pub parent: TypeTarget,
    /// Simple member name.
    pub name: String,
    /// Pre-serialized member signature blob.
    pub signature: Vec<u8>,
    /// Set when the member resolves to a definition in the module being edited.
    pub resolves_to: Option<Definition>,
}

/// The target of a method occurrence (call, method impl declaration,
/// generic instantiation).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MethodTarget {
    /// A method defined in the module being edited.
    Definition(MethodId),
    /// An external or constructed-parent member.
    Reference(MemberRefTarget),
}

/// A generic method instantiation (`MethodSpec` row shape).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodInstantiation {
    /// The generic method being instantiated.
    pub method: MethodTarget,
    /// Type arguments, in declaration order.
    pub type_args: Vec<TypeSignature>,
}

/// An entity referenced by a visited definition, signature or body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReferencedEntity {
    /// A type occurrence.
    Type(TypeTarget),
    /// A member occurrence.
    Member(MemberRefTarget),
    /// A generic method instantiation.
    MethodInstantiation(MethodInstantiation),
    /// A `ldstr` string literal.
    UserString(String),
}

/// A structured type signature, sufficient for local slots, `TypeSpec` blobs
/// and `MethodSpec` type arguments.
///
/// Serialization lives on the writer (it interns `TypeRef`/`TypeSpec` rows as
/// it goes); this is the shape lowering hands over.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    /// `bool`
    Boolean,
    /// `char`
    Char,
    /// `i8`
    SByte,
    /// `u8`
    Byte,
    /// `i16`
    Int16,
    /// `u16`
    UInt16,
    /// `i32`
    Int32,
    /// `u32`
    UInt32,
    /// `i64`
    Int64,
    /// `u64`
    UInt64,
    /// `f32`
    Single,
    /// `f64`
    Double,
    /// `System.IntPtr`
    IntPtr,
    /// `System.UIntPtr`
    UIntPtr,
    /// `System.Object`
    Object,
    /// `System.String`
    String,
    /// A reference type.
    Class(TypeTarget),
    /// A value type.
    ValueType(TypeTarget),
    /// A single-dimensional, zero-based array.
    SzArray(Box<TypeSignature>),
    /// An unmanaged pointer.
    Pointer(Box<TypeSignature>),
    /// A generic instantiation of a named type.
    GenericInstance {
        /// The open generic type.
        generic: TypeTarget,
        /// Whether the open type is a value type.
        value_type: bool,
        /// Type arguments, in declaration order.
        args: Vec<TypeSignature>,
    },
    /// A generic parameter of the containing type (`!n`).
    GenericTypeParameter(u32),
    /// A generic parameter of the containing method (`!!n`).
    GenericMethodParameter(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality_of_member_refs() {
        let make = || MemberRefTarget {
            parent: TypeTarget::Reference(TypeRefName {
                scope: RefScope::Assembly(AssemblyReference::named("System.Runtime")),
                namespace: "System".into(),
                name: "Console".into(),
                resolves_to: None,
            }),
            name: "WriteLine".into(),
            signature: vec![0x00, 0x01, 0x01, 0x0E],
            resolves_to: None,
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn test_constructed_types_compare_by_shape() {
        let list_of_int = |arg| TypeSignature::GenericInstance {
            generic: TypeTarget::Reference(TypeRefName {
                scope: RefScope::Assembly(AssemblyReference::named("System.Collections")),
                namespace: "System.Collections.Generic".into(),
                name: "List`1".into(),
                resolves_to: None,
            }),
            value_type: false,
            args: vec![arg],
        };
        assert_eq!(list_of_int(TypeSignature::Int32), list_of_int(TypeSignature::Int32));
        assert_ne!(list_of_int(TypeSignature::Int32), list_of_int(TypeSignature::Int64));
    }
}
