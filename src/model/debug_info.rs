//! Per-method debug records carried across generations.
//!
//! For every method body it emits, the writer records a
//! [`MethodDebugInfo`] keyed by the method's row ID. The record accumulates in
//! the baseline from generation to generation and is what lets the debugger
//! correlate a method's successive bodies: the [`MethodDebugId`] is the
//! durable key, the [`EncLocalInfo`] list maps local slots, and the state
//! machine layout re-identifies hoisted locals after lowering has rewritten
//! the method beyond recognition.

use crate::model::locals::{LocalSlotConstraints, SynthesizedLocalKind};
use crate::model::refs::TypeTarget;

/// The durable identity of a method body: emitter ordinal plus the generation
/// that emitted it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MethodDebugId {
    /// Emitter-assigned method ordinal.
    pub ordinal: u32,
    /// Generation that emitted this body (0 = original PE).
    pub generation: u32,
}

/// Identity of a long-lived local slot within its method.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LocalDebugId {
    /// Offset of the declaring syntax from the method body start.
    pub syntax_offset: i32,
    /// Distinguishes slots declared at the same syntax offset.
    pub ordinal: u32,
}

/// EnC slot information recorded for one local of an emitted body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncLocalInfo {
    /// An unnamed short-lived temporary; only the signature is kept.
    Temporary {
        /// The serialized local type, exactly as placed in the local signature.
        signature: Vec<u8>,
    },
    /// A long-lived slot that must be re-identifiable next generation.
    Slot {
        /// Slot identity.
        id: LocalDebugId,
        /// Semantic role of the slot.
        kind: SynthesizedLocalKind,
        /// ByRef/pinned constraints.
        constraints: LocalSlotConstraints,
        /// The serialized local type, exactly as placed in the local signature.
        signature: Vec<u8>,
    },
}

impl EncLocalInfo {
    /// The serialized signature bytes of this slot.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        match self {
            Self::Temporary { signature } | Self::Slot { signature, .. } => signature,
        }
    }
}

/// Debug descriptor of a lambda created by a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LambdaDebugInfo {
    /// Offset of the lambda's syntax from the method body start.
    pub syntax_offset: i32,
    /// Ordinal of the closure scope the lambda captures, -1 for static lambdas.
    pub closure_ordinal: i32,
}

/// Debug descriptor of a closure scope created by a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClosureDebugInfo {
    /// Offset of the scope's syntax from the method body start.
    pub syntax_offset: i32,
}

/// A local hoisted into a state machine field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoistedLocalSlot {
    /// Identity the slot carried before hoisting.
    pub id: LocalDebugId,
    /// Semantic role of the hoisted local.
    pub kind: SynthesizedLocalKind,
    /// Field name the local was hoisted into.
    pub name: String,
}

/// State machine layout recorded for iterator/async methods.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct StateMachineDebugInfo {
    /// Metadata name of the state machine type.
    pub type_name: String,
    /// Hoisted user and synthesized locals, in field order.
    pub hoisted_local_slots: Vec<HoistedLocalSlot>,
    /// Awaiter field types, in field order; `None` for cleared slots.
    pub awaiter_slots: Vec<Option<TypeTarget>>,
}

/// Everything recorded for a method emitted in some generation, keyed in the
/// baseline by the method's `MethodDef` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDebugInfo {
    /// Durable body identity.
    pub id: MethodDebugId,
    /// Per-slot EnC information, in slot order.
    pub locals: Vec<EncLocalInfo>,
    /// Lambdas created by this body.
    pub lambdas: Vec<LambdaDebugInfo>,
    /// Closure scopes created by this body.
    pub closures: Vec<ClosureDebugInfo>,
    /// State machine layout, when the method is an iterator/async kickoff.
    pub state_machine: Option<StateMachineDebugInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enc_local_info_signature_accessor() {
        let temp = EncLocalInfo::Temporary { signature: vec![0x08] };
        assert_eq!(temp.signature(), [0x08]);

        let slot = EncLocalInfo::Slot {
            id: LocalDebugId { syntax_offset: 10, ordinal: 0 },
            kind: SynthesizedLocalKind::USER_DEFINED,
            constraints: LocalSlotConstraints::empty(),
            signature: vec![0x0E],
        };
        assert_eq!(slot.signature(), [0x0E]);
    }
}
