//! Per-iteration observers, invoked once per completed driver iteration.

use crate::options::SolverOptions;
use crate::solver::SolverState;

/// Hook invoked once per solver iteration for logging, monitoring, or early stopping
/// decisions that don't fit the [`crate::terminators::Terminator`] shape.
pub trait Callback {
    /// Creates a new callback from solver options.
    fn new(options: &SolverOptions) -> Self
    where
        Self: Sized;

    /// Called at the end of each iteration with the current solver state.
    fn call(&mut self, state: &SolverState);
}

/// A callback that does nothing. The default when no per-iteration output is needed.
pub struct NoOpCallback;

impl Callback for NoOpCallback {
    fn new(_options: &SolverOptions) -> Self {
        Self
    }

    fn call(&mut self, _state: &SolverState) {}
}

/// Prints the lower/upper bound and elapsed time to stdout each iteration.
pub struct ConvergenceOutput;

impl Callback for ConvergenceOutput {
    fn new(_options: &SolverOptions) -> Self {
        Self
    }

    fn call(&mut self, state: &SolverState) {
        println!(
            "| {:6} | lb {:<12.6} | ub {:<12.6} | {:>8.3}s |",
            state.iteration,
            state.lower_bound,
            state.upper_bound,
            state.elapsed.as_secs_f64(),
        );
    }
}
