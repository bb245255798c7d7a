//! Error types for the optnet toolkit
//!
//! Errors fall into three families: configuration problems detected before a
//! network is built, resource exhaustion while building or solving, and
//! algorithm invariant violations in a solved partition. Nothing is retried
//! internally; every error is surfaced to the caller.

use std::collections::TryReserveError;

/// Main error type for optnet operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid build parameters (`npc`, `rmin`/`rmax`, `sc`, ...)
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Topology grid does not match the cost volume's lateral extents
    #[error("Dimension mismatch: topology expects {expected:?}, volume provides {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Allocation failure while building or solving
    #[error("Resource exhausted: {0}")]
    Resource(String),

    /// Cost range cannot be represented by the capacity type
    #[error("Capacity overflow: cost range exceeds the capacity type")]
    CapacityOverflow,

    /// solve() or extract() called before build()
    #[error("No network has been built")]
    NotBuilt,

    /// extract() called before a successful solve()
    #[error("Network has not been solved")]
    NotSolved,

    /// Solve interrupted through its cancellation flag
    #[error("Solve cancelled")]
    Cancelled,

    /// A solved partition violates contiguity or the smoothness bound
    #[error("Algorithm invariant violated: {0}")]
    AlgorithmInvariant(String),

    /// Malformed parameter file
    #[error("Parameter file error: {0}")]
    ParamFile(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Parameter or dimension problem, raised before any network exists
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::DimensionMismatch { .. } | Error::ParamFile(_)
        )
    }

    /// Allocation or representability failure
    pub fn is_resource(&self) -> bool {
        matches!(self, Error::Resource(_) | Error::CapacityOverflow)
    }

    /// Builder defect surfaced by the extractor
    pub fn is_invariant(&self) -> bool {
        matches!(self, Error::AlgorithmInvariant(_))
    }
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Self {
        Error::Resource(err.to_string())
    }
}

/// Convenience result type for optnet operations
pub type Result<T> = std::result::Result<T, Error>;
