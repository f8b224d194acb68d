use std::time::Instant;

use log::{info, warn};

use super::graph::Graph;
use super::messages;
use super::primal_storage::PrimalStorage;
use crate::options::SolverOptions;
use crate::solver::{RunOutcome, SolverDriver, SolverHooks, SolverState};
use crate::{Cost, Direction, SolverError};

/// Drives a QAP [`Graph`] through alternating pairwise and uniqueness sweeps.
pub struct QapSolver {
    graph: Graph,
    constant: Cost,
    options: SolverOptions,
    iterations: u64,
    duration: std::time::Duration,
    poisoned: bool,
}

impl QapSolver {
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

    /// Saves the current unary primal, so it can be recovered with [`Self::restore_primal`]
    /// after exploring a perturbed assignment.
    pub fn save_primal(&self, storage: &mut PrimalStorage) {
        storage.save(&self.graph);
    }

    pub fn restore_primal(&mut self, storage: &PrimalStorage) {
        storage.restore(&mut self.graph);
    }

    fn check_alive(&self) -> Result<(), SolverError> {
        if self.poisoned {
            return Err(SolverError::invariant_violation(
                "solver poisoned by a prior invariant violation",
            ));
        }
        Ok(())
    }

    fn pairwise_sweep(&mut self, direction: Direction) -> Result<(), SolverError> {
        let order: Vec<_> = match direction {
            Direction::Forward => (0..self.graph.num_unaries()).collect(),
            Direction::Backward => (0..self.graph.num_unaries()).rev().collect(),
        };
        for idx in order {
            let u = super::UnaryId(idx);
            messages::receive(&mut self.graph, direction, u)?;
            messages::send(&mut self.graph, direction, u)?;
            messages::round_primal(&mut self.graph, direction, u)?;
            messages::propagate_primal(&mut self.graph, u)?;
        }
        Ok(())
    }

    fn uniqueness_sweep(&mut self) -> Result<(), SolverError> {
        for idx in 0..self.graph.num_uniquenesses() {
            let q = super::UniquenessId(idx);
            messages::send_to_uniqueness(&mut self.graph, q)?;
            messages::send_to_unaries(&mut self.graph, q)?;
        }
        Ok(())
    }
}

impl SolverDriver for QapSolver {
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
            let swept = self
                .pairwise_sweep(Direction::Forward)
                .and_then(|_| self.pairwise_sweep(Direction::Backward))
                .and_then(|_| self.uniqueness_sweep());
            if let Err(err) = swept {
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
                    "qap iteration {} lower_bound={:.6} upper_bound={:.6} elapsed={:?}",
                    state.iteration, state.lower_bound, state.upper_bound, state.elapsed
                );
            }
            if let Some(callback) = hooks.callback.as_deref_mut() {
                callback.call(&state);
            }
            if let Some(terminator) = hooks.terminator.as_deref_mut() {
                if let Some(reason) = terminator.terminate() {
                    warn!("qap run terminated early after {i} iterations: {reason:?}");
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
    use crate::qap::Graph;

    fn two_by_two_assignment() -> Graph {
        let mut g = Graph::new();
        let unaries: Vec<_> = (0..2).map(|_| g.add_unary(2).unwrap()).collect();
        let costs = [[0.0, 5.0], [5.0, 0.0]];
        for (u, row) in unaries.iter().zip(costs) {
            g.set_unary_cost(*u, 0, row[0]).unwrap();
            g.set_unary_cost(*u, 1, row[1]).unwrap();
        }
        for label in 0..2 {
            let q = g.add_uniqueness(2).unwrap();
            for &u in &unaries {
                g.add_uniqueness_link(u, label, q).unwrap();
            }
            for slot in 0..3 {
                g.set_uniqueness_cost(q, slot, 0.0).unwrap();
            }
        }
        g.finalize().unwrap();
        g
    }

    #[test]
    fn run_converges_to_zero_on_the_two_by_two_assignment() {
        let graph = two_by_two_assignment();
        let mut solver = QapSolver::new(graph, SolverOptions::default());
        let mut hooks = SolverHooks::none();
        solver.run(10, &mut hooks).unwrap();
        assert!(solver.lower_bound().abs() < 1e-6);
    }
}
