use thiserror::Error;

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        $crate::Error::Invariant {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Invariant {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can
/// potentially return.
///
/// The delta writer has a deliberately small failure surface: every invariant
/// breach is unrecoverable and abandons the delta, and cooperative cancellation
/// produces no output at all. Reference-to-added-member findings are *not*
/// errors; they are reported as [`crate::diagnostics::Diagnostic`] values on the
/// emit result and left to the caller's policy.
///
/// # Error Categories
///
/// - [`Error::Invariant`] - A structural invariant of the delta was violated
///   (non-contiguous row IDs, mutation of a frozen index, an unresolvable
///   pre-existing definition, a duplicate `EncMap` token). The delta must be
///   discarded; no baseline is produced.
/// - [`Error::Cancelled`] - The cancellation token was signalled at a safe
///   point. All partially built state is abandoned.
///
/// # Examples
///
/// ```rust,ignore
/// match writer.emit(enc_id, &mut sink) {
///     Ok(delta) => apply(delta),
///     Err(cildelta::Error::Cancelled) => { /* user aborted the edit */ }
///     Err(e) => eprintln!("delta abandoned: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A structural invariant of the delta writer was violated.
    ///
    /// This covers every unrecoverable failure mode: row IDs that are not
    /// contiguous, writes to a frozen index, a definition that should resolve
    /// to an existing row but does not, an unexpected change classification,
    /// and duplicate `EncMap` tokens. The error carries the source location
    /// where the violation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file in which the violation was detected
    /// * `line` - Source line in which the violation was detected
    #[error("Invariant violated - {file}:{line}: {message}")]
    Invariant {
        /// The message to be printed for the Invariant error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Emission was cancelled cooperatively.
    ///
    /// Returned when the [`crate::cancellation::CancellationToken`] is
    /// signalled and the writer reaches one of its designated safe points
    /// (between top-level types, between pipeline phases). No delta bytes and
    /// no updated baseline are produced.
    #[error("Delta emission was cancelled")]
    Cancelled,
}
