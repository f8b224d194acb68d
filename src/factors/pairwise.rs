use crate::{Cost, Direction, Primal, SolverError};

/// A pairwise factor's primal is a pair of labels, one per endpoint unary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairwisePrimal {
    pub left: Primal,
    pub right: Primal,
}

impl PairwisePrimal {
    pub fn is_set(&self) -> bool {
        self.left.is_set() && self.right.is_set()
    }
}

/// A cost per `(label0, label1)` pair, stored row-major as `costs[l0 * n1 + l1]`.
#[derive(Debug, Clone)]
pub struct PairwiseFactor {
    costs: Vec<Cost>,
    num_labels0: usize,
    num_labels1: usize,
    primal: PairwisePrimal,
}

impl PairwiseFactor {
    pub fn new(num_labels0: usize, num_labels1: usize) -> Self {
        Self {
            costs: vec![Cost::NAN; num_labels0 * num_labels1],
            num_labels0,
            num_labels1,
            primal: PairwisePrimal::default(),
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.num_labels0, self.num_labels1)
    }

    pub fn is_prepared(&self) -> bool {
        self.costs.iter().all(|c| !c.is_nan())
    }

    /// The strict row-major bound: `l0 * n1 + l1 < costs.len()`, together with per-axis
    /// range checks. The original C++ source checked the weaker `l0 * l1 < costs.len()`,
    /// which can admit out-of-range writes; this port never reproduces that weaker bound.
    fn linear_index(&self, l0: usize, l1: usize) -> Result<usize, SolverError> {
        if l0 >= self.num_labels0 || l1 >= self.num_labels1 {
            return Err(SolverError::usage(format!(
                "pairwise index ({l0}, {l1}) out of range for ({}, {}) labels",
                self.num_labels0, self.num_labels1
            )));
        }
        let idx = l0 * self.num_labels1 + l1;
        debug_assert!(idx < self.costs.len());
        Ok(idx)
    }

    pub fn set(&mut self, l0: usize, l1: usize, cost: Cost) -> Result<(), SolverError> {
        let idx = self.linear_index(l0, l1)?;
        self.costs[idx] = cost;
        Ok(())
    }

    pub fn get(&self, l0: usize, l1: usize) -> Cost {
        self.costs[l0 * self.num_labels1 + l1]
    }

    pub fn lower_bound(&self) -> Cost {
        self.costs.iter().cloned().fold(Cost::INFINITY, Cost::min)
    }

    /// Adds `msg` to every cell of row `l0` (the `label0 = l0` slice).
    pub fn repam0(&mut self, l0: usize, msg: Cost) {
        for l1 in 0..self.num_labels1 {
            let idx = l0 * self.num_labels1 + l1;
            self.costs[idx] += msg;
        }
    }

    /// Adds `msg` to every cell of column `l1` (the `label1 = l1` slice).
    pub fn repam1(&mut self, l1: usize, msg: Cost) {
        for l0 in 0..self.num_labels0 {
            let idx = l0 * self.num_labels1 + l1;
            self.costs[idx] += msg;
        }
    }

    /// Dispatches to [`Self::repam0`] for [`Direction::Forward`], [`Self::repam1`] otherwise.
    pub fn repam(&mut self, direction: Direction, idx: usize, msg: Cost) {
        match direction {
            Direction::Forward => self.repam0(idx, msg),
            Direction::Backward => self.repam1(idx, msg),
        }
    }

    /// For `Forward`: `min_l1 costs[l, l1]`. For `Backward`: `min_l0 costs[l0, l]`.
    pub fn min_marginal(&self, direction: Direction, label: usize) -> Cost {
        match direction {
            Direction::Forward => (0..self.num_labels1)
                .map(|l1| self.get(label, l1))
                .fold(Cost::INFINITY, Cost::min),
            Direction::Backward => (0..self.num_labels0)
                .map(|l0| self.get(l0, label))
                .fold(Cost::INFINITY, Cost::min),
        }
    }

    pub fn primal(&self) -> PairwisePrimal {
        self.primal
    }

    pub fn reset_primal(&mut self) {
        self.primal = PairwisePrimal::default();
    }

    pub fn set_primal0(&mut self, label: usize) {
        self.primal.left = Primal::set(label);
    }

    pub fn set_primal1(&mut self, label: usize) {
        self.primal.right = Primal::set(label);
    }

    pub fn evaluate_primal(&self) -> Cost {
        match (self.primal.left.get(), self.primal.right.get()) {
            (Some(l0), Some(l1)) => self.get(l0, l1),
            _ => Cost::INFINITY,
        }
    }

    /// Sets the primal to the argmin cell, row-major tie-break (lowest linear index).
    pub fn round_primal(&mut self) {
        let mut best_idx = 0;
        let mut best_cost = Cost::INFINITY;
        for (idx, &cost) in self.costs.iter().enumerate() {
            if cost < best_cost {
                best_cost = cost;
                best_idx = idx;
            }
        }
        self.primal.left = Primal::set(best_idx / self.num_labels1);
        self.primal.right = Primal::set(best_idx % self.num_labels1);
    }
}
