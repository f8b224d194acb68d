use std::time::Instant;

use log::{info, warn};

use super::graph::Graph;
use super::messages;
use crate::options::SolverOptions;
use crate::solver::{RunOutcome, SolverDriver, SolverHooks, SolverState};
use crate::{Cost, SolverError};

/// Drives a CT [`Graph`] through repeated conflict-message sweeps.
pub struct CtSolver {
    graph: Graph,
    constant: Cost,
    options: SolverOptions,
    iterations: u64,
    duration: std::time::Duration,
    poisoned: bool,
}

impl CtSolver {
    pub fn new(graph: Graph, options: SolverOptions) -> Self {
        Self {
            graph,
            constant: 0.0,
            options,
            iterations: 0,
            duration: std::time::Duration::ZERO,
            poisoned: false,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn set_constant(&mut self, constant: Cost) {
        self.constant = constant;
    }

    fn check_alive(&self) -> Result<(), SolverError> {
        if self.poisoned {
            return Err(SolverError::invariant_violation(
                "solver poisoned by a prior invariant violation",
            ));
        }
        Ok(())
    }

    fn sweep(&mut self) -> Result<(), SolverError> {
        for idx in 0..self.graph.num_conflicts() {
            let c = super::graph::ConflictId(idx);
            messages::send_messages_to_conflict(&mut self.graph, c)?;
            messages::send_messages_to_detection(&mut self.graph, c)?;
        }
        for idx in 0..self.graph.num_detections() {
            self.graph
                .detection_mut(super::graph::DetectionId(idx))?
                .factor
                .round_primal();
        }
        for idx in 0..self.graph.num_conflicts() {
            let c = super::graph::ConflictId(idx);
            messages::propagate_primal_to_conflict(&mut self.graph, c)?;
            messages::propagate_primal_to_detections(&mut self.graph, c)?;
        }
        Ok(())
    }
}

impl SolverDriver for CtSolver {
    fn lower_bound(&self) -> Cost {
        self.constant + self.graph.lower_bound()
    }

    fn evaluate_primal(&self) -> Cost {
        self.constant + self.graph.evaluate_primal()
    }

    fn reset_primal(&mut self) {
        self.graph.reset_primal();
    }

    fn run(
        &mut self,
        max_iterations: u64,
        hooks: &mut SolverHooks,
    ) -> Result<RunOutcome, SolverError> {
        self.check_alive()?;
        if !self.graph.is_finalized() {
            return Err(SolverError::not_prepared("graph not finalized"));
        }
        let start = Instant::now();
        if let Some(terminator) = hooks.terminator.as_deref_mut() {
            terminator.initialize();
        }

        for i in 0..max_iterations {
            let lb_before = self.lower_bound();
            if let Err(err) = self.sweep() {
                self.poisoned = true;
                return Err(err);
            }
            let lb_after = self.lower_bound();
            if cfg!(debug_assertions) && lb_after < lb_before - self.options.epsilon {
                self.poisoned = true;
                return Err(SolverError::invariant_violation(format!(
                    "lower bound decreased from {lb_before} to {lb_after}"
                )));
            }

            self.iterations += 1;
            self.duration = start.elapsed();

            let state = SolverState {
                iteration: self.iterations,
                lower_bound: lb_after,
                upper_bound: self.evaluate_primal(),
                elapsed: self.duration,
            };
            if self.iterations % self.options.log_interval.max(1) == 0 {
                info!(
                    "ct iteration {} lower_bound={:.6} upper_bound={:.6} elapsed={:?}",
                    state.iteration, state.lower_bound, state.upper_bound, state.elapsed
                );
            }
            if let Some(callback) = hooks.callback.as_deref_mut() {
                callback.call(&state);
            }
            if let Some(terminator) = hooks.terminator.as_deref_mut() {
                if let Some(reason) = terminator.terminate() {
                    warn!("ct run terminated early after {i} iterations: {reason:?}");
                    return Ok(RunOutcome::Terminated {
                        iterations: self.iterations,
                        reason,
                    });
                }
            }
        }

        Ok(RunOutcome::Converged {
            iterations: self.iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ct::Graph;

    fn two_detection_conflict() -> Graph {
        let mut g = Graph::new();
        let d0 = g.add_detection(1).unwrap();
        let d1 = g.add_detection(1).unwrap();
        g.set_detection_off_cost(d0, 0.0).unwrap();
        g.set_detection_on_cost(d0, 0, -3.0).unwrap();
        g.set_detection_off_cost(d1, 0.0).unwrap();
        g.set_detection_on_cost(d1, 0, -1.0).unwrap();
        let c = g.add_conflict(2).unwrap();
        g.add_conflict_link(d0, c).unwrap();
        g.add_conflict_link(d1, c).unwrap();
        for slot in 0..3 {
            g.set_conflict_cost(c, slot, 0.0).unwrap();
        }
        g.finalize().unwrap();
        g
    }

    #[test]
    fn run_reaches_the_documented_bound() {
        let graph = two_detection_conflict();
        let mut solver = CtSolver::new(graph, SolverOptions::default());
        let mut hooks = SolverHooks::none();
        solver.run(1, &mut hooks).unwrap();
        assert!((solver.lower_bound() - (-3.0)).abs() < 1e-6);
    }
}
