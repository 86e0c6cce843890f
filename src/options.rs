//! Emission options recognized by the delta writer.

/// Controls which synthesized locals receive debugger-visible names.
///
/// The naming of long-lived synthesized locals is part of the wire contract
/// with the debugger (see [`crate::model::locals`]). In `Full` and `PdbOnly`
/// modes every long-lived synthesized local is named; with `None` only the
/// kinds the debugger depends on regardless of build flavor (lambda
/// display-class locals, cached anonymous-method delegates) are named.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugInformationFormat {
    /// Full debug information, including a standalone PDB.
    Full,
    /// PDB only, no debuggable code guarantees.
    PdbOnly,
    /// No debug information (release-style emit).
    None,
}

/// Options for a single delta emission.
///
/// `compress_metadata_stream` exists for parity with the full writer's option
/// surface but is fixed off for deltas: the runtime consumes the uncompressed
/// `#-` tabular stream when applying an EnC update. Passing `true` is rejected
/// at the start of [`crate::writer::DeltaMetadataWriter::emit`].
#[derive(Clone, Copy, Debug)]
pub struct EmitOptions {
    /// Which synthesized locals receive names, see [`DebugInformationFormat`].
    pub debug_information: DebugInformationFormat,
    /// Must remain `false`; deltas never compress the tabular stream.
    pub compress_metadata_stream: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            debug_information: DebugInformationFormat::Full,
            compress_metadata_stream: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = EmitOptions::default();
        assert_eq!(options.debug_information, DebugInformationFormat::Full);
        assert!(!options.compress_metadata_stream);
    }
}
