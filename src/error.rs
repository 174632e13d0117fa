//! Error type shared by the accumulators and the template tools.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Structural failures.
///
/// Every variant is raised before any state is mutated, so an accumulator that
/// returned an error is exactly as it was before the call. Numerically
/// degenerate statistics (zero counts, zero variance) are not errors and show
/// up as NaN in [`Statistic`](crate::ttest::Statistic).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An array dimension does not match what the accumulator expects
    #[error("shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Class label outside the tested populations
    #[error("invalid label {label} for trace {index}")]
    InvalidLabel { index: usize, label: u16 },

    /// Sample value outside the 16-bit signed trace domain
    #[error("sample at trace {trace}, position {position} is outside the i16 domain")]
    UnsupportedType { trace: usize, position: usize },

    /// Rejected construction or update parameters
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Two accumulators with different geometry cannot be merged
    #[error("incompatible merge: expected {expected}, found {found}")]
    IncompatibleMerge { expected: String, found: String },

    /// A class has no profiling traces
    #[error("class {class} has no traces")]
    EmptyClass { class: usize },

    /// A covariance or scatter matrix is not positive definite
    #[error("{what} is not positive definite")]
    SingularCovariance { what: String },
}

impl Error {
    pub(crate) fn shape(what: &'static str, expected: usize, found: usize) -> Self {
        Error::ShapeMismatch {
            what,
            expected,
            found,
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(e: validator::ValidationErrors) -> Self {
        Error::InvalidConfiguration(format!("{e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = Error::shape("trace length", 3, 4);
        assert_eq!(
            e.to_string(),
            "shape mismatch for trace length: expected 3, found 4"
        );

        let e = Error::InvalidLabel { index: 7, label: 2 };
        assert_eq!(e.to_string(), "invalid label 2 for trace 7");
    }
}
