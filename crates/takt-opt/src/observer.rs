//! Progress sink and abort hook for the optimiser.

/// Progress snapshot passed to the observer after each candidate
/// evaluation.
#[derive(Clone, Debug)]
pub struct Progress {
    /// Candidates simulated so far.
    pub evaluated: u32,
    /// Rough upper bound on evaluations (binary-search depth per role).
    pub total_estimate: u32,
    /// The worker-count vector just evaluated.
    pub candidate: Vec<u32>,
    pub feasible: bool,
}

/// Callbacks invoked by [`Optimiser::run`][crate::Optimiser::run] between
/// candidate evaluations.
///
/// All methods have default implementations so implementors only override
/// what they care about.  No threading primitives are involved — the caller
/// decides whether to forward progress to a UI.
pub trait OptObserver {
    /// Called after each candidate simulation.
    fn on_candidate(&mut self, _progress: &Progress) {}

    /// Polled before each candidate simulation; returning `true` stops the
    /// search with the best feasible result so far.
    fn should_abort(&self) -> bool {
        false
    }
}

/// An [`OptObserver`] that does nothing.  Use when you need to call `run`
/// but don't want progress callbacks.
pub struct NoopObserver;

impl OptObserver for NoopObserver {}
