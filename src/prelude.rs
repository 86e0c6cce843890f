//! Convenient re-exports of the types most hosts touch.
//!
//! ```rust
//! use cildelta::prelude::*;
//! ```

pub use crate::baseline::{BaselineDelta, EmitBaseline, MethodImplKey};
pub use crate::cancellation::CancellationToken;
pub use crate::diagnostics::{Diagnostic, DiagnosticCode};
pub use crate::metadata::guid::Guid;
pub use crate::metadata::heaps::HeapLengths;
pub use crate::metadata::tables::{FuncCode, TableId, TableSizes};
pub use crate::metadata::token::Token;
pub use crate::model::changes::{ChangeOracle, DefinitionMap, RowMap, SymbolChange, SymbolChangeSet};
pub use crate::model::debug_info::{
    ClosureDebugInfo, EncLocalInfo, HoistedLocalSlot, LambdaDebugInfo, LocalDebugId,
    MethodDebugId, MethodDebugInfo, StateMachineDebugInfo,
};
pub use crate::model::locals::{
    parse_synthesized_local_name, synthesized_local_name, LocalSlotConstraints,
    SynthesizedLocalKind,
};
pub use crate::model::refs::{
    AssemblyReference, MemberRefTarget, MethodInstantiation, MethodTarget, ModuleReference,
    RefScope, ReferencedEntity, TypeRefName, TypeSignature, TypeTarget,
};
pub use crate::model::{
    AnonymousTypeValue, AuxRowCounts, Definition, EventDefinition, EventId, FieldDefinition,
    FieldId, GenericParamKey, GenericParameter, LocalDefinition, LocalType, MethodBody,
    MethodDefinition, MethodId, MethodImplDefinition, ModuleModel, ParamKey,
    ParameterDefinition, PropertyDefinition, PropertyId, TypeDefinition, TypeId,
};
pub use crate::options::{DebugInformationFormat, EmitOptions};
pub use crate::writer::{
    DeltaMetadataWriter, DeltaSink, DeltaView, EncDelta, EncLogEntry, NullSink,
};
pub use crate::{Error, Result};
