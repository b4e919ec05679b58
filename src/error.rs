use thiserror::Error;

/// Error type for the shapelet mining core.
///
/// Only caller mistakes surface as errors. Degenerate statistics (all
/// labels identical) produce an empty result, and cooperative
/// cancellation produces a partial result with
/// [`MiningOutcome::complete`](crate::MiningOutcome) set to `false`;
/// neither is an `Err`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Dataset shape mismatches or out-of-range mining parameters,
    /// detected before enumeration begins.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Distance computation on sequences of incompatible length.
    /// Indicates a programming error in the caller.
    #[error("shape mismatch: sequence lengths {left} and {right} are incompatible")]
    ShapeMismatch { left: usize, right: usize },
}

/// Result type alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
