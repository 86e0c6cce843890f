//! The module surface the delta writer consumes.
//!
//! The writer never holds symbol pointers: every definition lives in an arena
//! on [`ModuleModel`] and is addressed by a `Copy` id newtype. Ids are stable
//! across generations - the host that detects changes guarantees that the
//! `MethodId` of an edited method is the same id it carried when the method
//! was first emitted - which is what lets the baseline's addition maps and the
//! definition map resolve pre-existing symbols without object identity.
//!
//! Cross-entity links (type to member, type to nested type) are ids as well,
//! so the model is cycle-free by construction and all lookups are O(1).
//!
//! # Key Components
//!
//! - [`ModuleModel`] - arena of all definitions plus module-level carry-over
//!   state (anonymous types, synthesized members, auxiliary row counts)
//! - [`TypeDefinition`], [`MethodDefinition`], [`FieldDefinition`],
//!   [`EventDefinition`], [`PropertyDefinition`] - lowered definitions
//! - [`Definition`] - kind-tagged id used by the change oracle
//! - [`refs`] - reference targets and type signatures
//! - [`changes`] - change classification and definition-map capability traits
//! - [`debug_info`] - per-method debug records carried in the baseline
//! - [`locals`] - synthesized local kinds, constraints and naming

pub mod changes;
pub mod debug_info;
pub mod locals;
pub mod refs;

use rustc_hash::FxHashMap;

use crate::model::debug_info::{ClosureDebugInfo, LambdaDebugInfo, LocalDebugId, StateMachineDebugInfo};
use crate::model::locals::{LocalSlotConstraints, SynthesizedLocalKind};
use crate::model::refs::{MethodTarget, ReferencedEntity, TypeSignature};

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        pub struct $name(pub u32);

        impl $name {
            /// Arena slot of this definition.
            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// Identity of a type definition, stable across generations.
    TypeId
);
define_id!(
    /// Identity of a method definition, stable across generations.
    MethodId
);
define_id!(
    /// Identity of a field definition, stable across generations.
    FieldId
);
define_id!(
    /// Identity of an event definition, stable across generations.
    EventId
);
define_id!(
    /// Identity of a property definition, stable across generations.
    PropertyId
);

/// A kind-tagged definition id, the unit the change oracle classifies.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Definition {
    /// A type definition.
    Type(TypeId),
    /// A method definition.
    Method(MethodId),
    /// A field definition.
    Field(FieldId),
    /// An event definition.
    Event(EventId),
    /// A property definition.
    Property(PropertyId),
}

/// Key of a parameter row: owning method plus ECMA sequence number
/// (0 is the return parameter).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ParamKey {
    /// The owning method.
    pub method: MethodId,
    /// The ECMA parameter sequence number.
    pub sequence: u16,
}

/// Key of a generic parameter row: owner (type or method) plus ordinal
/// within the owner's consolidated parameter list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GenericParamKey {
    /// The owning type or method.
    pub owner: Definition,
    /// Zero-based position in the owner's consolidated parameter list.
    pub index: u16,
}

/// A generic type or method parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericParameter {
    /// Source name of the parameter.
    pub name: String,
}

/// A lowered type definition.
#[derive(Clone, Debug, Default)]
pub struct TypeDefinition {
    /// Namespace, empty for nested or global types.
    pub namespace: String,
    /// Simple name.
    pub name: String,
    /// Enclosing type for nested types.
    pub enclosing: Option<TypeId>,
    /// The type's own generic parameters (consolidation walks `enclosing`).
    pub generic_params: Vec<GenericParameter>,
    /// Fields owned by this type, in emission order.
    pub fields: Vec<FieldId>,
    /// Methods owned by this type, in emission order.
    pub methods: Vec<MethodId>,
    /// Events owned by this type, in emission order.
    pub events: Vec<EventId>,
    /// Properties owned by this type, in emission order.
    pub properties: Vec<PropertyId>,
    /// Nested types, in emission order.
    pub nested_types: Vec<TypeId>,
    /// Explicit interface implementation overrides owned by this type.
    pub method_impls: Vec<MethodImplDefinition>,
    /// Entities referenced by the type header (base type, interfaces, attributes).
    pub references: Vec<ReferencedEntity>,
}

impl TypeDefinition {
    /// Creates a type definition with the given namespace and name.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into(), ..Self::default() }
    }
}

/// An explicit interface implementation override.
#[derive(Clone, Debug)]
pub struct MethodImplDefinition {
    /// The implementing method; must be defined in this module.
    pub implementing: MethodId,
    /// The implemented declaration (typically an interface method).
    pub declaration: MethodTarget,
}

/// A lowered method definition.
#[derive(Clone, Debug)]
pub struct MethodDefinition {
    /// Simple name.
    pub name: String,
    /// Owning type; maintained by [`ModuleModel::attach_method`].
    pub owner: TypeId,
    /// Emitter-assigned ordinal, preserved into
    /// [`crate::model::debug_info::MethodDebugId`].
    pub method_ordinal: u32,
    /// Implicitly declared methods record no debug information.
    pub implicitly_declared: bool,
    /// Pre-serialized method signature blob.
    pub signature: Vec<u8>,
    /// The return parameter, present when it needs a `Param` row.
    pub return_param: Option<ParameterDefinition>,
    /// Positional parameters, in sequence order.
    pub params: Vec<ParameterDefinition>,
    /// The method's own generic parameters.
    pub generic_params: Vec<GenericParameter>,
    /// Entities referenced by the method signature and attributes.
    pub references: Vec<ReferencedEntity>,
    /// The lowered body, absent for abstract/extern methods.
    pub body: Option<MethodBody>,
}

impl MethodDefinition {
    /// Creates a method definition with the given name and emitter ordinal.
    #[must_use]
    pub fn new(name: impl Into<String>, method_ordinal: u32) -> Self {
        Self {
            name: name.into(),
            owner: TypeId(0),
            method_ordinal,
            implicitly_declared: false,
            signature: Vec::new(),
            return_param: None,
            params: Vec::new(),
            generic_params: Vec::new(),
            references: Vec::new(),
            body: None,
        }
    }

    /// The parameters that receive `Param` rows, in emission order: the return
    /// parameter first when it carries custom attributes, then the positional
    /// parameters.
    pub fn emitted_params(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.return_param
            .iter()
            .filter(|p| p.has_custom_attributes)
            .chain(self.params.iter())
    }
}

/// A method parameter.
#[derive(Clone, Debug)]
pub struct ParameterDefinition {
    /// Source name, empty for unnamed parameters.
    pub name: String,
    /// ECMA sequence number; 0 for the return parameter.
    pub sequence: u16,
    /// Whether the parameter carries custom attributes. Decides whether a
    /// return parameter gets a `Param` row at all.
    pub has_custom_attributes: bool,
}

/// A lowered method body as the delta writer sees it.
#[derive(Clone, Debug, Default)]
pub struct MethodBody {
    /// Local slots in signature order.
    pub locals: Vec<LocalDefinition>,
    /// Whether the body retained sequence points; gates debugger remap.
    pub has_sequence_points: bool,
    /// Entities referenced by the body's IL (call targets, field loads,
    /// constructed types, `ldstr` literals).
    pub references: Vec<ReferencedEntity>,
    /// Lambdas created by this method, in syntax order.
    pub lambdas: Vec<LambdaDebugInfo>,
    /// Closure scopes created by this method, in syntax order.
    pub closures: Vec<ClosureDebugInfo>,
    /// State machine layout when this body is an iterator/async MoveNext.
    pub state_machine: Option<StateMachineDebugInfo>,
}

/// A single local slot of a method body.
#[derive(Clone, Debug)]
pub struct LocalDefinition {
    /// Debugger-visible name; `None` for unnamed temporaries.
    pub name: Option<String>,
    /// Semantic role of the slot.
    pub kind: SynthesizedLocalKind,
    /// Slot identity; `None` marks a short-lived temporary that records a
    /// signature-only [`crate::model::debug_info::EncLocalInfo`].
    pub id: Option<LocalDebugId>,
    /// ByRef/pinned constraints of the slot.
    pub constraints: LocalSlotConstraints,
    /// The slot type, either structured or carried over pre-serialized.
    pub ty: LocalType,
}

/// The type of a local slot.
#[derive(Clone, Debug)]
pub enum LocalType {
    /// A structured type signature serialized by this generation.
    Signature(TypeSignature),
    /// A signature blob cached from a previous generation; appended verbatim,
    /// never recursed into.
    Serialized(Vec<u8>),
}

/// A lowered field definition.
#[derive(Clone, Debug)]
pub struct FieldDefinition {
    /// Simple name.
    pub name: String,
    /// Owning type; maintained by [`ModuleModel::attach_field`].
    pub owner: TypeId,
    /// Pre-serialized field signature blob.
    pub signature: Vec<u8>,
    /// Entities referenced by the field type and attributes.
    pub references: Vec<ReferencedEntity>,
}

impl FieldDefinition {
    /// Creates a field definition.
    #[must_use]
    pub fn new(name: impl Into<String>, signature: Vec<u8>) -> Self {
        Self { name: name.into(), owner: TypeId(0), signature, references: Vec::new() }
    }
}

/// A lowered event definition.
#[derive(Clone, Debug)]
pub struct EventDefinition {
    /// Simple name.
    pub name: String,
    /// Owning type; maintained by [`ModuleModel::attach_event`].
    pub owner: TypeId,
    /// Entities referenced by the event type and accessor attributes.
    pub references: Vec<ReferencedEntity>,
}

impl EventDefinition {
    /// Creates an event definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), owner: TypeId(0), references: Vec::new() }
    }
}

/// A lowered property definition.
#[derive(Clone, Debug)]
pub struct PropertyDefinition {
    /// Simple name.
    pub name: String,
    /// Owning type; maintained by [`ModuleModel::attach_property`].
    pub owner: TypeId,
    /// Pre-serialized property signature blob.
    pub signature: Vec<u8>,
    /// Entities referenced by the property type and attributes.
    pub references: Vec<ReferencedEntity>,
}

impl PropertyDefinition {
    /// Creates a property definition.
    #[must_use]
    pub fn new(name: impl Into<String>, signature: Vec<u8>) -> Self {
        Self { name: name.into(), owner: TypeId(0), signature, references: Vec::new() }
    }
}

/// Value side of the anonymous type map carried across generations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnonymousTypeValue {
    /// Metadata name of the anonymous type template.
    pub name: String,
    /// Unique index assigned when the template was first emitted.
    pub unique_index: u32,
}

/// Delta row counts of the auxiliary tables whose rows the base serializer
/// produces from the lowered definitions (attributes, constants, layouts,
/// accessor semantics and so on). The delta writer needs only the counts, to
/// lay out `EncLog`/`EncMap` ranges.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuxRowCounts {
    /// `Constant` rows added by this delta.
    pub constant: u32,
    /// `CustomAttribute` rows added by this delta.
    pub custom_attribute: u32,
    /// `DeclSecurity` rows added by this delta.
    pub decl_security: u32,
    /// `ClassLayout` rows added by this delta.
    pub class_layout: u32,
    /// `FieldLayout` rows added by this delta.
    pub field_layout: u32,
    /// `MethodSemantics` rows added by this delta.
    pub method_semantics: u32,
    /// `ImplMap` rows added by this delta.
    pub impl_map: u32,
    /// `FieldRva` rows added by this delta. Nonzero counts are mapped like any
    /// other table rather than silently dropped.
    pub field_rva: u32,
    /// `NestedClass` rows added by this delta.
    pub nested_class: u32,
    /// `InterfaceImpl` rows added by this delta.
    pub interface_impl: u32,
    /// `GenericParamConstraint` rows added by this delta.
    pub generic_param_constraint: u32,
}

/// Arena of all definitions in the module being edited, plus the module-level
/// state that rides along into the next baseline.
#[derive(Clone, Debug, Default)]
pub struct ModuleModel {
    /// Module file name.
    pub module_name: String,
    /// Display name of the containing assembly.
    pub assembly_name: String,
    types: Vec<TypeDefinition>,
    methods: Vec<MethodDefinition>,
    fields: Vec<FieldDefinition>,
    events: Vec<EventDefinition>,
    properties: Vec<PropertyDefinition>,
    /// Anonymous type templates, keyed by their property-name shape.
    pub anonymous_types: FxHashMap<String, AnonymousTypeValue>,
    /// Synthesized member names per owning type.
    pub synthesized_members: FxHashMap<TypeId, Vec<String>>,
    /// Auxiliary table row counts for this delta.
    pub aux_row_counts: AuxRowCounts,
}

impl ModuleModel {
    /// Creates an empty model for the given module/assembly names.
    #[must_use]
    pub fn new(module_name: impl Into<String>, assembly_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            assembly_name: assembly_name.into(),
            ..Self::default()
        }
    }

    /// Adds a type definition and returns its id.
    pub fn add_type(&mut self, def: TypeDefinition) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(def);
        id
    }

    /// Adds a method to the arena and attaches it to its owning type.
    pub fn attach_method(&mut self, owner: TypeId, mut def: MethodDefinition) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        def.owner = owner;
        self.methods.push(def);
        self.types[owner.index()].methods.push(id);
        id
    }

    /// Adds a field to the arena and attaches it to its owning type.
    pub fn attach_field(&mut self, owner: TypeId, mut def: FieldDefinition) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        def.owner = owner;
        self.fields.push(def);
        self.types[owner.index()].fields.push(id);
        id
    }

    /// Adds an event to the arena and attaches it to its owning type.
    pub fn attach_event(&mut self, owner: TypeId, mut def: EventDefinition) -> EventId {
        let id = EventId(self.events.len() as u32);
        def.owner = owner;
        self.events.push(def);
        self.types[owner.index()].events.push(id);
        id
    }

    /// Adds a property to the arena and attaches it to its owning type.
    pub fn attach_property(&mut self, owner: TypeId, mut def: PropertyDefinition) -> PropertyId {
        let id = PropertyId(self.properties.len() as u32);
        def.owner = owner;
        self.properties.push(def);
        self.types[owner.index()].properties.push(id);
        id
    }

    /// Marks `nested` as a nested type of `enclosing`.
    pub fn nest_type(&mut self, enclosing: TypeId, nested: TypeId) {
        self.types[nested.index()].enclosing = Some(enclosing);
        self.types[enclosing.index()].nested_types.push(nested);
    }

    /// Looks up a type definition.
    #[must_use]
    pub fn type_def(&self, id: TypeId) -> &TypeDefinition {
        &self.types[id.index()]
    }

    /// Mutable access to a type definition, used while lowering.
    pub fn type_def_mut(&mut self, id: TypeId) -> &mut TypeDefinition {
        &mut self.types[id.index()]
    }

    /// Looks up a method definition.
    #[must_use]
    pub fn method(&self, id: MethodId) -> &MethodDefinition {
        &self.methods[id.index()]
    }

    /// Mutable access to a method definition, used while lowering.
    pub fn method_mut(&mut self, id: MethodId) -> &mut MethodDefinition {
        &mut self.methods[id.index()]
    }

    /// Looks up a field definition.
    #[must_use]
    pub fn field(&self, id: FieldId) -> &FieldDefinition {
        &self.fields[id.index()]
    }

    /// Looks up an event definition.
    #[must_use]
    pub fn event(&self, id: EventId) -> &EventDefinition {
        &self.events[id.index()]
    }

    /// Looks up a property definition.
    #[must_use]
    pub fn property(&self, id: PropertyId) -> &PropertyDefinition {
        &self.properties[id.index()]
    }

    /// Consolidated generic parameters of a type: outermost enclosing type's
    /// parameters first, then inward, then the type's own.
    #[must_use]
    pub fn consolidated_generic_params(&self, id: TypeId) -> Vec<&GenericParameter> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(tid) = current {
            chain.push(tid);
            current = self.types[tid.index()].enclosing;
        }
        chain
            .iter()
            .rev()
            .flat_map(|tid| self.types[tid.index()].generic_params.iter())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_members_sets_owner() {
        let mut module = ModuleModel::new("App.dll", "App");
        let tid = module.add_type(TypeDefinition::new("App", "C"));
        let mid = module.attach_method(tid, MethodDefinition::new("M", 0));
        let fid = module.attach_field(tid, FieldDefinition::new("_f", vec![0x06, 0x08]));

        assert_eq!(module.method(mid).owner, tid);
        assert_eq!(module.field(fid).owner, tid);
        assert_eq!(module.type_def(tid).methods, vec![mid]);
        assert_eq!(module.type_def(tid).fields, vec![fid]);
    }

    #[test]
    fn test_consolidated_generic_params_outer_first() {
        let mut module = ModuleModel::new("App.dll", "App");
        let outer = module.add_type(TypeDefinition {
            generic_params: vec![GenericParameter { name: "TOuter".into() }],
            ..TypeDefinition::new("App", "Outer`1")
        });
        let inner = module.add_type(TypeDefinition {
            generic_params: vec![GenericParameter { name: "TInner".into() }],
            ..TypeDefinition::new("", "Inner`1")
        });
        module.nest_type(outer, inner);

        let names: Vec<&str> = module
            .consolidated_generic_params(inner)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["TOuter", "TInner"]);
    }

    #[test]
    fn test_emitted_params_skips_bare_return_param() {
        let mut method = MethodDefinition::new("M", 0);
        method.return_param = Some(ParameterDefinition {
            name: String::new(),
            sequence: 0,
            has_custom_attributes: false,
        });
        method.params.push(ParameterDefinition {
            name: "x".into(),
            sequence: 1,
            has_custom_attributes: false,
        });
        let sequences: Vec<u16> = method.emitted_params().map(|p| p.sequence).collect();
        assert_eq!(sequences, [1]);

        method.return_param.as_mut().unwrap().has_custom_attributes = true;
        let sequences: Vec<u16> = method.emitted_params().map(|p| p.sequence).collect();
        assert_eq!(sequences, [0, 1]);
    }
}
