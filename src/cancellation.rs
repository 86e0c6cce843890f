//! Cooperative cancellation for delta emission.
//!
//! The delta writer runs single-threaded from start to finish, but the host
//! (typically an IDE debugging session) may abandon an edit at any time. The
//! writer polls a [`crate::cancellation::CancellationToken`] at designated safe
//! points - between top-level types in the change driver and between pipeline
//! phases in the orchestrator. On cancellation all partially built state is
//! dropped and no baseline is produced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::Result;

/// A cloneable cancellation flag polled at safe points during emission.
///
/// Cloning the token shares the underlying flag, so the host can hand one clone
/// to the writer and keep another to signal from its own event loop. The token
/// never suspends the writer; it only causes the next safe-point poll to return
/// [`crate::Error::Cancelled`].
///
/// # Examples
///
/// ```rust
/// use cildelta::CancellationToken;
///
/// let token = CancellationToken::new();
/// let for_writer = token.clone();
/// assert!(!for_writer.is_cancelled());
///
/// token.cancel();
/// assert!(for_writer.is_cancelled());
/// assert!(for_writer.check().is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new, unsignalled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation. All clones of this token observe the signal.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true if cancellation has been signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Safe-point poll: returns [`crate::Error::Cancelled`] once signalled.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if [`CancellationToken::cancel`] has
    /// been called on this token or any of its clones.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(crate::Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
