use crate::{Cost, Primal, SolverError};

/// A cost per label, plus the chosen label (if any).
#[derive(Debug, Clone)]
pub struct UnaryFactor {
    costs: Vec<Cost>,
    primal: Primal,
}

impl UnaryFactor {
    /// Creates a unary factor over `num_labels` labels, all costs uninitialized (NaN).
    pub fn new(num_labels: usize) -> Self {
        Self {
            costs: vec![Cost::NAN; num_labels],
            primal: Primal::unset(),
        }
    }

    pub fn num_labels(&self) -> usize {
        self.costs.len()
    }

    pub fn is_prepared(&self) -> bool {
        self.costs.iter().all(|c| !c.is_nan())
    }

    fn check_label(&self, label: usize) -> Result<(), SolverError> {
        if label >= self.costs.len() {
            return Err(SolverError::usage(format!(
                "label {label} out of range for unary factor with {} labels",
                self.costs.len()
            )));
        }
        Ok(())
    }

    pub fn set(&mut self, label: usize, cost: Cost) -> Result<(), SolverError> {
        self.check_label(label)?;
        self.costs[label] = cost;
        Ok(())
    }

    pub fn get(&self, label: usize) -> Cost {
        self.costs[label]
    }

    /// Adds `msg` to `costs[label]`.
    pub fn repam(&mut self, label: usize, msg: Cost) {
        self.costs[label] += msg;
    }

    pub fn lower_bound(&self) -> Cost {
        self.costs.iter().cloned().fold(Cost::INFINITY, Cost::min)
    }

    pub fn evaluate_primal(&self) -> Cost {
        match self.primal.get() {
            Some(l) => self.costs[l],
            None => Cost::INFINITY,
        }
    }

    pub fn primal(&self) -> Primal {
        self.primal
    }

    pub fn reset_primal(&mut self) {
        self.primal = Primal::unset();
    }

    /// Sets the primal to the argmin label, lowest index wins ties.
    pub fn round_primal(&mut self) {
        let mut best_label = 0;
        let mut best_cost = Cost::INFINITY;
        for (label, &cost) in self.costs.iter().enumerate() {
            if cost < best_cost {
                best_cost = cost;
                best_label = label;
            }
        }
        self.primal = Primal::set(best_label);
    }

    pub fn set_primal(&mut self, label: usize) {
        self.primal = Primal::set(label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(costs: &[Cost]) -> UnaryFactor {
        let mut u = UnaryFactor::new(costs.len());
        for (l, &c) in costs.iter().enumerate() {
            u.set(l, c).unwrap();
        }
        u
    }

    #[test]
    fn lower_bound_is_min_cost() {
        let u = prepared(&[3.0, 1.0, 2.0]);
        assert_eq!(u.lower_bound(), 1.0);
    }

    #[test]
    fn round_primal_ties_pick_lowest_index() {
        let mut u = prepared(&[1.0, 1.0, 2.0]);
        u.round_primal();
        assert_eq!(u.primal().get(), Some(0));
    }

    #[test]
    fn repam_shifts_a_single_label() {
        let mut u = prepared(&[0.0, 0.0]);
        u.repam(1, 5.0);
        assert_eq!(u.get(0), 0.0);
        assert_eq!(u.get(1), 5.0);
    }

    #[test]
    fn evaluate_primal_is_infinite_when_unset() {
        let u = prepared(&[0.0, 0.0]);
        assert_eq!(u.evaluate_primal(), Cost::INFINITY);
    }

    #[test]
    fn set_rejects_out_of_range_label() {
        let mut u = UnaryFactor::new(2);
        assert!(u.set(2, 0.0).is_err());
    }

    #[test]
    fn fresh_factor_is_not_prepared_until_every_cost_is_set() {
        let mut u = UnaryFactor::new(2);
        assert!(!u.is_prepared());
        u.set(0, 0.0).unwrap();
        assert!(!u.is_prepared());
        u.set(1, 0.0).unwrap();
        assert!(u.is_prepared());
    }
}
