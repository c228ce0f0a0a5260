//! Errors returned by the fitters, the sum table, and the utilities.
//!
//! Every failure is a precondition violation detected at the call that receives the bad input,
//! or a linear solve which did not go through. Use [`Error::kind`] to branch on the category.

/// Which linear solver reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solver {
    /// Cholesky factorisation of a Hermitian positive definite matrix.
    Hermitian,
    /// LU factorisation with partial pivoting of a square matrix.
    General,
}
impl std::fmt::Display for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hermitian => write!(f, "Hermitian positive definite"),
            Self::General => write!(f, "general"),
        }
    }
}

/// Coarse category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lengths of samples, weights, or parameters disagree.
    Size,
    /// A count or order is below its minimum, or overflows.
    Range,
    /// The input has no usable content (all zero, or not finite).
    Degenerate,
    /// The linear system could not be solved.
    Numerical,
    /// A shared resource is in use elsewhere.
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Two lengths that must agree do not.
    #[error("size mismatch for `{what}`: expected {expected}, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// There are fewer samples than free parameters.
    #[error("{samples} samples cannot determine {parameters} parameters")]
    TooFewSamples { samples: usize, parameters: usize },

    /// A count is below the minimum the model needs.
    #[error("`{what}` must be at least {minimum}, got {actual}")]
    OutOfRange {
        what: &'static str,
        minimum: usize,
        actual: usize,
    },

    /// A size computation overflowed `usize`.
    #[error("`{what}` is too large")]
    Overflow { what: &'static str },

    /// The input vector carries no information to work with.
    #[error("degenerate input: {0}")]
    Degenerate(&'static str),

    /// The system is singular, indefinite, or too ill-conditioned for the scalar precision.
    ///
    /// Try a regularisation (`norm_cost`), a lower order, or a wider scalar type.
    #[error("the {solver} solver failed on a {dim}x{dim} system")]
    Singular { solver: Solver, dim: usize },

    /// A shared [`SumTable`](crate::SumTable) is borrowed elsewhere.
    #[error("the shared sum table is already borrowed")]
    TableInUse,
}
impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SizeMismatch { .. } | Self::TooFewSamples { .. } => ErrorKind::Size,
            Self::OutOfRange { .. } | Self::Overflow { .. } => ErrorKind::Range,
            Self::Degenerate(_) => ErrorKind::Degenerate,
            Self::Singular { .. } => ErrorKind::Numerical,
            Self::TableInUse => ErrorKind::Busy,
        }
    }
}

/// Result type of this crate.
pub type Result<V> = std::result::Result<V, Error>;
