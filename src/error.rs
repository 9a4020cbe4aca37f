//! Error kinds. `InvalidInput` is rejected before planning
//! begins; `NoSolution` and `Timeout` are ordinarily reported inside the
//! response envelope's metrics rather than raised here — `SolveError` is
//! what the façade returns when it cannot even attempt a solve.

#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no solution exists for this instance")]
    NoSolution,

    #[error("solve exceeded its time or expansion cap")]
    Timeout,

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SolveError>;
