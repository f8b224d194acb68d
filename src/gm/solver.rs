use std::time::Instant;

use log::{info, warn};

use super::graph::Graph;
use super::messages;
use crate::options::SolverOptions;
use crate::solver::{RunOutcome, SolverDriver, SolverHooks, SolverState};
use crate::{Cost, Direction, SolverError};

/// Drives a [`Graph`] through repeated forward/backward sweeps.
pub struct GmSolver {
    graph: Graph,
    constant: Cost,
    options: SolverOptions,
    iterations: u64,
    duration: std::time::Duration,
    poisoned: bool,
}

impl GmSolver {
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

    /// A problem-wide additive offset not tied to any factor.
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

    fn sweep(&mut self, direction: Direction) -> Result<(), SolverError> {
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
}

impl SolverDriver for GmSolver {
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
            if let Err(err) = self.sweep(Direction::Forward).and_then(|_| self.sweep(Direction::Backward)) {
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
                    "gm iteration {} lower_bound={:.6} upper_bound={:.6} elapsed={:?}",
                    state.iteration, state.lower_bound, state.upper_bound, state.elapsed
                );
            }
            if let Some(callback) = hooks.callback.as_deref_mut() {
                callback.call(&state);
            }

            if let Some(terminator) = hooks.terminator.as_deref_mut() {
                if let Some(reason) = terminator.terminate() {
                    warn!("gm run terminated early after {i} iterations: {reason:?}");
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
    use crate::gm::Graph;

    fn chain_of_three() -> Graph {
        let mut g = Graph::new();
        let unaries: Vec<_> = (0..3).map(|_| g.add_unary(2).unwrap()).collect();
        let unary_costs = [[0.0, 1.0], [1.0, 0.0], [0.0, 1.0]];
        for (u, costs) in unaries.iter().zip(unary_costs) {
            g.set_unary_cost(*u, 0, costs[0]).unwrap();
            g.set_unary_cost(*u, 1, costs[1]).unwrap();
        }
        for i in 0..2 {
            let p = g.add_pairwise(2, 2).unwrap();
            g.add_pairwise_link(unaries[i], unaries[i + 1], p).unwrap();
            for l0 in 0..2 {
                for l1 in 0..2 {
                    let cost = if l0 == l1 { 0.0 } else { 1.0 };
                    g.set_pairwise_cost(p, l0, l1, cost).unwrap();
                }
            }
        }
        g.finalize().unwrap();
        g
    }

    #[test]
    fn run_rejects_a_non_finalized_graph() {
        let mut solver = GmSolver::new(Graph::new(), SolverOptions::default());
        let mut hooks = SolverHooks::none();
        assert!(matches!(
            solver.run(1, &mut hooks),
            Err(SolverError::NotPrepared { .. })
        ));
    }

    #[test]
    fn run_converges_to_the_documented_bound_on_the_three_chain() {
        let graph = chain_of_three();
        let mut solver = GmSolver::new(graph, SolverOptions::default());
        let mut hooks = SolverHooks::none();
        let outcome = solver.run(10, &mut hooks).unwrap();
        assert!(matches!(outcome, RunOutcome::Converged { .. }));
        assert!((solver.lower_bound() - 1.0).abs() < 1e-6);
    }
}
