//! Solver-level errors, layered over `voltra_core::CoreError`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] voltra_core::CoreError),

    /// A matrix/vector operation was given mismatched dimensions.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Dense or sparse LU factorization found the assembled system singular.
    #[error("singular matrix during MNA solve")]
    SingularMatrix,

    /// Lemke's method terminated on a ray (no complementary solution found)
    /// instead of a complementary basic feasible solution.
    #[error("LCP solve failed: {message}")]
    LcpFailure { message: String },

    /// The adaptive step controller shrank `h` below `h_min` without
    /// producing an accepted step.
    #[error("step size collapsed to {h} (below minimum {h_min})")]
    StepTooSmall { h: f64, h_min: f64 },

    /// A solved quantity was NaN or infinite.
    #[error("non-finite value encountered in {where_}")]
    NonFinite { where_: String },

    /// The caller's cancellation flag returned true between steps.
    #[error("run cancelled by caller")]
    Cancelled,
}

impl Error {
    /// Whether the step loop can recover from this error by shrinking `h`
    /// and retrying, as opposed to having to abort the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::SingularMatrix | Error::LcpFailure { .. })
    }
}
