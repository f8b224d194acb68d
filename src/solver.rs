//! The shared solver-driver contract implemented by [`crate::gm::GmSolver`],
//! [`crate::qap::QapSolver`], and [`crate::ct::CtSolver`].

use std::time::Duration;

use crate::callback::Callback;
use crate::terminators::{TerminationReason, Terminator};
use crate::{Cost, SolverError};

/// A snapshot of solver progress, handed to a [`Callback`] once per iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverState {
    pub iteration: u64,
    pub lower_bound: Cost,
    pub upper_bound: Cost,
    pub elapsed: Duration,
}

/// Optional per-run observers: a progress [`Callback`] and a [`Terminator`].
#[derive(Default)]
pub struct SolverHooks<'a> {
    pub callback: Option<&'a mut dyn Callback>,
    pub terminator: Option<&'a mut dyn Terminator>,
}

impl<'a> SolverHooks<'a> {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Ran to `max_iterations` without an installed terminator firing.
    Converged { iterations: u64 },
    /// An installed [`Terminator`] requested an early stop.
    Terminated {
        iterations: u64,
        reason: TerminationReason,
    },
}

impl RunOutcome {
    pub fn iterations(self) -> u64 {
        match self {
            RunOutcome::Converged { iterations } => iterations,
            RunOutcome::Terminated { iterations, .. } => iterations,
        }
    }
}

/// Common accounting and lifecycle shared by every problem family's solver.
///
/// `run` has deliberately no default body: the original source asserted `false` in the
/// base class and required every concrete family to override it, which this trait encodes
/// as a compile-time obligation instead of a runtime assertion.
pub trait SolverDriver {
    /// `constant + Σ factor.lower_bound()` over every node in the graph.
    fn lower_bound(&self) -> Cost;

    /// `constant + Σ factor.evaluate_primal()`, +∞ if any factor's primal is unset or the
    /// graph is primal-inconsistent.
    fn evaluate_primal(&self) -> Cost;

    /// Clears every factor's primal.
    fn reset_primal(&mut self);

    /// Runs up to `max_iterations` sweeps, polling `hooks.terminator` between iterations
    /// and reporting `hooks.callback` once per completed iteration.
    fn run(
        &mut self,
        max_iterations: u64,
        hooks: &mut SolverHooks,
    ) -> Result<RunOutcome, SolverError>;

    /// Alias for [`Self::evaluate_primal`]; kept distinct for readability at call sites
    /// that think in terms of "current best integer solution" rather than "primal energy".
    fn upper_bound(&self) -> Cost {
        self.evaluate_primal()
    }

    /// Delegates to an external MIP adapter. No adapter ships with this crate.
    fn solve_ilp(&mut self) -> Result<(), SolverError> {
        Err(SolverError::feature_disabled("solve_ilp"))
    }

    /// Delegates to an external CombiLP driver. No driver ships with this crate.
    fn execute_combilp(&mut self) -> Result<(), SolverError> {
        Err(SolverError::feature_disabled("execute_combilp"))
    }
}
