use takt_sim::SimError;
use thiserror::Error;

/// Errors surfaced by the optimiser.
#[derive(Debug, Error)]
pub enum OptError {
    /// The request itself is malformed (empty space, inverted bounds, bad
    /// initial guess).
    #[error("optimiser request invalid: {0}")]
    Request(String),

    /// A candidate simulation failed; the search space cannot fix this.
    #[error(transparent)]
    Sim(#[from] SimError),
}

pub type OptResult<T> = Result<T, OptError>;
