//! Error types for exactum operations.

use thiserror::Error;

/// Errors that can occur during exact geometric operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExactError {
    /// Open paths may only be supplied as subject geometry.
    #[error("open paths cannot be used as clip geometry")]
    OpenClipPath,

    /// The sweep detected an internal inconsistency and aborted.
    ///
    /// The clipper leaves no partial output behind; callers observe the
    /// error instead of a half-built solution.
    #[error("clipping sweep failed: {reason}")]
    SweepFailed {
        /// Which invariant was violated.
        reason: &'static str,
    },

    /// The snap scale factor is zero, negative, or not finite.
    #[error("snap scale must be finite and positive")]
    InvalidScale,
}
