//! Synthesized local kinds, slot constraints and debugger naming.
//!
//! The kind of a compiler-generated local and the name it is emitted under are
//! an on-disk contract with the debugger and the EnC engine: a later session
//! recovers `(kind, unique_id)` from the member name alone. The numeric kind
//! values below are therefore wire-frozen and collected in one place.

use bitflags::bitflags;

use crate::options::DebugInformationFormat;

/// Prefix of synthesized local names, fixed by the debugger contract.
pub const SYNTHESIZED_LOCAL_NAME_PREFIX: &str = "CS$";

/// Semantic role of a local slot, with a wire-frozen numeric identity.
///
/// Kinds below [`SynthesizedLocalKind::USER_DEFINED`] are short-lived
/// temporaries: their slots may be freely reused and they never receive names
/// or slot identities. Kinds at or above it are long-lived: their slots must
/// be re-identifiable across generations.
///
/// Two frozen value groups exist. `CONDITIONAL_BRANCH_DISCRIMINATOR` through
/// `FIXED_STRING` must match the values the legacy native compiler encoded in
/// debug metadata (value 4 was its return-value temporary and is never
/// re-used; `FOR_EACH_ARRAY_INDEX_0` spans one value per array dimension up to
/// `FOR_EACH_ARRAY_LIMIT_0`). The kinds from `LOCK_TAKEN` onward were added
/// for EnC-aware lowering and are equally frozen now that they appear in
/// shipped debug metadata.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SynthesizedLocalKind(pub i32);

impl SynthesizedLocalKind {
    /// Temporary introduced by the emit layer; never survives a statement.
    pub const EMITTER_TEMP: Self = Self(-3);
    /// Temporary introduced during lowering.
    pub const LOWERING_TEMP: Self = Self(-2);
    /// A local the user declared in source. Long-lived, named from source.
    pub const USER_DEFINED: Self = Self(-1);

    /// Holds a branch condition value across a sequence point.
    pub const CONDITIONAL_BRANCH_DISCRIMINATOR: Self = Self(1);
    /// The object of a `lock` statement.
    pub const LOCK: Self = Self(2);
    /// The resource of a `using` statement.
    pub const USING: Self = Self(3);
    /// The enumerator of a `foreach` over an enumerable.
    pub const FOR_EACH_ENUMERATOR: Self = Self(5);
    /// The array of a `foreach` over an array.
    pub const FOR_EACH_ARRAY: Self = Self(6);
    /// First per-dimension index of a `foreach` over an array.
    pub const FOR_EACH_ARRAY_INDEX_0: Self = Self(7);
    /// Last per-dimension slot reserved for array `foreach` indices.
    pub const FOR_EACH_ARRAY_LIMIT_0: Self = Self(263);
    /// The pinned string of a `fixed` statement.
    pub const FIXED_STRING: Self = Self(264);

    /// The lock-taken flag of a `lock` statement.
    pub const LOCK_TAKEN: Self = Self(265);
    /// A value spilled across an `await`.
    pub const SPILL: Self = Self(266);
    /// The return value of a state machine MoveNext.
    pub const STATE_MACHINE_RETURN_VALUE: Self = Self(267);
    /// The propagated exception of a state machine.
    pub const STATE_MACHINE_EXCEPTION: Self = Self(268);
    /// The display-class instance holding captured variables.
    pub const LAMBDA_DISPLAY_CLASS: Self = Self(269);
    /// A cached anonymous-method delegate instance.
    pub const CACHED_ANONYMOUS_METHOD_DELEGATE: Self = Self(270);
    /// The return value of an async method.
    pub const ASYNC_METHOD_RETURN_VALUE: Self = Self(271);
    /// The cached `this` of a struct state machine.
    pub const STATE_MACHINE_CACHED_THIS: Self = Self(272);
    /// An exception hoisted out of an awaited filter.
    pub const EXCEPTION_FILTER_AWAIT_HOISTED_EXCEPTION_LOCAL: Self = Self(273);
}

impl SynthesizedLocalKind {
    /// The wire value recorded in debug metadata.
    #[must_use]
    pub fn wire_value(self) -> i32 {
        self.0
    }

    /// Per-dimension `foreach` array index kind for dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim` exceeds the reserved dimension range.
    #[must_use]
    pub fn for_each_array_index(dim: u16) -> Self {
        let value = Self::FOR_EACH_ARRAY_INDEX_0.0 + i32::from(dim);
        assert!(value <= Self::FOR_EACH_ARRAY_LIMIT_0.0, "array dimension {dim} out of range");
        Self(value)
    }

    /// Decodes a wire value, rejecting values outside the frozen ranges.
    #[must_use]
    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            -3..=-1 | 1..=3 | 5..=273 => Some(Self(value)),
            _ => None,
        }
    }

    /// Long-lived kinds must keep their slot identity across generations.
    #[must_use]
    pub fn is_long_lived(self) -> bool {
        self >= Self::USER_DEFINED
    }

    /// Whether a local of this kind receives a debugger-visible name under the
    /// given debug information level.
    ///
    /// User-defined locals keep their source names unconditionally. Other
    /// long-lived kinds are named when debug information is emitted at all,
    /// except the kinds the debugger depends on in every build flavor
    /// (display-class instances and cached delegates), which are always named.
    #[must_use]
    pub fn is_named(self, debug_information: DebugInformationFormat) -> bool {
        if !self.is_long_lived() {
            return false;
        }
        match self {
            Self::USER_DEFINED
            | Self::LAMBDA_DISPLAY_CLASS
            | Self::CACHED_ANONYMOUS_METHOD_DELEGATE => true,
            _ => debug_information != DebugInformationFormat::None,
        }
    }
}

impl std::fmt::Debug for SynthesizedLocalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SynthesizedLocalKind({})", self.0)
    }
}

bitflags! {
    /// Constraints of a local slot, recorded alongside its signature so a
    /// later generation reuses a compatible slot.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct LocalSlotConstraints: u8 {
        /// The slot holds a managed reference.
        const BYREF = 0x1;
        /// The slot pins its referent.
        const PINNED = 0x2;
    }
}

/// Formats the debugger-visible name of a synthesized long-lived local:
/// `CS$<kind>$<unique_id>` with the id zero-padded to four digits.
///
/// Returns `None` for short-lived kinds and for user-defined locals (which
/// keep their source names).
#[must_use]
pub fn synthesized_local_name(kind: SynthesizedLocalKind, unique_id: u32) -> Option<String> {
    if !kind.is_long_lived() || kind == SynthesizedLocalKind::USER_DEFINED {
        return None;
    }
    Some(format!("{SYNTHESIZED_LOCAL_NAME_PREFIX}{}${unique_id:04}", kind.wire_value()))
}

/// Parses a name produced by [`synthesized_local_name`], recovering the kind
/// and unique id. Names of user locals (or anything else) parse as `None`.
#[must_use]
pub fn parse_synthesized_local_name(name: &str) -> Option<(SynthesizedLocalKind, u32)> {
    let rest = name.strip_prefix(SYNTHESIZED_LOCAL_NAME_PREFIX)?;
    let (kind_text, id_text) = rest.split_once('$')?;
    let kind = SynthesizedLocalKind::from_wire(kind_text.parse::<i32>().ok()?)?;
    if !kind.is_long_lived() || kind == SynthesizedLocalKind::USER_DEFINED {
        return None;
    }
    if id_text.len() < 4 || !id_text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((kind, id_text.parse::<u32>().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values_are_frozen() {
        assert_eq!(SynthesizedLocalKind::CONDITIONAL_BRANCH_DISCRIMINATOR.wire_value(), 1);
        assert_eq!(SynthesizedLocalKind::LOCK.wire_value(), 2);
        assert_eq!(SynthesizedLocalKind::USING.wire_value(), 3);
        assert_eq!(SynthesizedLocalKind::FOR_EACH_ENUMERATOR.wire_value(), 5);
        assert_eq!(SynthesizedLocalKind::FOR_EACH_ARRAY.wire_value(), 6);
        assert_eq!(SynthesizedLocalKind::FOR_EACH_ARRAY_INDEX_0.wire_value(), 7);
        assert_eq!(SynthesizedLocalKind::FOR_EACH_ARRAY_LIMIT_0.wire_value(), 263);
        assert_eq!(SynthesizedLocalKind::FIXED_STRING.wire_value(), 264);
        assert_eq!(SynthesizedLocalKind::LOCK_TAKEN.wire_value(), 265);
        assert_eq!(
            SynthesizedLocalKind::EXCEPTION_FILTER_AWAIT_HOISTED_EXCEPTION_LOCAL.wire_value(),
            273
        );
    }

    #[test]
    fn test_from_wire_rejects_reserved_values() {
        assert_eq!(SynthesizedLocalKind::from_wire(0), None);
        assert_eq!(SynthesizedLocalKind::from_wire(4), None);
        assert_eq!(SynthesizedLocalKind::from_wire(-4), None);
        assert_eq!(SynthesizedLocalKind::from_wire(274), None);
        assert_eq!(SynthesizedLocalKind::from_wire(2), Some(SynthesizedLocalKind::LOCK));
    }

    #[test]
    fn test_long_lived_boundary() {
        assert!(!SynthesizedLocalKind::LOWERING_TEMP.is_long_lived());
        assert!(!SynthesizedLocalKind::EMITTER_TEMP.is_long_lived());
        assert!(SynthesizedLocalKind::USER_DEFINED.is_long_lived());
        assert!(SynthesizedLocalKind::LOCK.is_long_lived());
    }

    #[test]
    fn test_for_each_array_index_range() {
        let dim0 = SynthesizedLocalKind::for_each_array_index(0);
        assert_eq!(dim0, SynthesizedLocalKind::FOR_EACH_ARRAY_INDEX_0);
        let dim3 = SynthesizedLocalKind::for_each_array_index(3);
        assert_eq!(dim3.wire_value(), 10);
        assert!(dim3.is_long_lived());
    }

    #[test]
    fn test_release_naming_restricted_to_debugger_kinds() {
        use crate::options::DebugInformationFormat as Fmt;
        assert!(SynthesizedLocalKind::LOCK.is_named(Fmt::Full));
        assert!(SynthesizedLocalKind::LOCK.is_named(Fmt::PdbOnly));
        assert!(!SynthesizedLocalKind::LOCK.is_named(Fmt::None));
        assert!(SynthesizedLocalKind::LAMBDA_DISPLAY_CLASS.is_named(Fmt::None));
        assert!(SynthesizedLocalKind::CACHED_ANONYMOUS_METHOD_DELEGATE.is_named(Fmt::None));
        assert!(!SynthesizedLocalKind::LOWERING_TEMP.is_named(Fmt::Full));
    }

    #[test]
    fn test_name_round_trip() {
        let name = synthesized_local_name(SynthesizedLocalKind::USING, 12).unwrap();
        assert_eq!(name, "CS$3$0012");
        assert_eq!(
            parse_synthesized_local_name(&name),
            Some((SynthesizedLocalKind::USING, 12))
        );

        let wide = synthesized_local_name(SynthesizedLocalKind::FIXED_STRING, 12345).unwrap();
        assert_eq!(wide, "CS$264$12345");
        assert_eq!(
            parse_synthesized_local_name(&wide),
            Some((SynthesizedLocalKind::FIXED_STRING, 12345))
        );
    }

    #[test]
    fn test_non_long_lived_kinds_produce_no_name() {
        assert_eq!(synthesized_local_name(SynthesizedLocalKind::LOWERING_TEMP, 1), None);
        assert_eq!(synthesized_local_name(SynthesizedLocalKind::EMITTER_TEMP, 1), None);
        assert_eq!(synthesized_local_name(SynthesizedLocalKind::USER_DEFINED, 1), None);
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert_eq!(parse_synthesized_local_name("myLocal"), None);
        assert_eq!(parse_synthesized_local_name("CS$"), None);
        assert_eq!(parse_synthesized_local_name("CS$4$0001"), None); // reserved kind
        assert_eq!(parse_synthesized_local_name("CS$-2$0001"), None); // short-lived
        assert_eq!(parse_synthesized_local_name("CS$2$12"), None); // underpadded id
        assert_eq!(parse_synthesized_local_name("CS$2$00x1"), None);
    }
}
