use crate::{Cost, Primal};

/// Shared core of an "at most one of K linked edges is active" constraint.
///
/// Both the QAP uniqueness factor and the CT conflict factor are, at their core, a dense
/// cost per slot, a chosen-slot primal, and the two-smallest-elements message rule that
/// keeps the lower bound over the constraint tight. This type owns exactly that: a
/// slot-indexed cost table, a primal slot, and the `least_two`/`min_excluding` helpers the
/// message kernels build on. It carries no notion of what a slot represents (a unary
/// label, a detection); the owning factor adds that on top.
#[derive(Debug, Clone)]
pub struct SlottedFactor {
    costs: Vec<Cost>,
    primal: Primal,
}

impl SlottedFactor {
    pub fn new(num_slots: usize) -> Self {
        Self {
            costs: vec![Cost::NAN; num_slots],
            primal: Primal::unset(),
        }
    }

    pub fn num_slots(&self) -> usize {
        self.costs.len()
    }

    pub fn is_prepared(&self) -> bool {
        self.costs.iter().all(|c| !c.is_nan())
    }

    pub fn get(&self, slot: usize) -> Cost {
        self.costs[slot]
    }

    pub fn set(&mut self, slot: usize, cost: Cost) {
        self.costs[slot] = cost;
    }

    pub fn repam(&mut self, slot: usize, msg: Cost) {
        self.costs[slot] += msg;
    }

    pub fn lower_bound(&self) -> Cost {
        self.costs.iter().cloned().fold(Cost::INFINITY, Cost::min)
    }

    /// The slot with the smallest cost, lowest index wins ties. `None` for an empty factor.
    pub fn argmin(&self) -> Option<usize> {
        self.costs
            .iter()
            .enumerate()
            .fold(None, |best, (slot, &cost)| match best {
                Some((_, best_cost)) if best_cost <= cost => best,
                _ => Some((slot, cost)),
            })
            .map(|(slot, _)| slot)
    }

    /// The minimum cost over every slot other than `slot`. Used by the QAP uniqueness
    /// kernel, which needs "what the rest of the constraint is offering" without the
    /// ambiguity a value-only two-smallest lookup has on ties.
    pub fn min_excluding(&self, slot: usize) -> Cost {
        self.costs
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != slot)
            .map(|(_, &c)| c)
            .fold(Cost::INFINITY, Cost::min)
    }

    /// The two smallest costs in the table, in ascending order. Needs at least two slots.
    ///
    /// Used by the conflict-factor message-to-detection kernel, which needs both the
    /// minimum and the runner-up to compute how much slack can be redistributed without
    /// letting the lower bound regress.
    pub fn least_two(&self) -> (Cost, Cost) {
        let mut first = Cost::INFINITY;
        let mut second = Cost::INFINITY;
        for &cost in &self.costs {
            if cost < first {
                second = first;
                first = cost;
            } else if cost < second {
                second = cost;
            }
        }
        (first, second)
    }

    pub fn primal(&self) -> Primal {
        self.primal
    }

    pub fn reset_primal(&mut self) {
        self.primal = Primal::unset();
    }

    pub fn set_primal(&mut self, slot: usize) {
        self.primal = Primal::set(slot);
    }

    pub fn evaluate_primal(&self) -> Cost {
        match self.primal.get() {
            Some(slot) => self.costs[slot],
            None => Cost::INFINITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(costs: &[Cost]) -> SlottedFactor {
        let mut s = SlottedFactor::new(costs.len());
        for (slot, &c) in costs.iter().enumerate() {
            s.set(slot, c);
        }
        s
    }

    #[test]
    fn min_excluding_skips_only_the_named_slot() {
        let s = prepared(&[1.0, -2.0, 5.0]);
        assert_eq!(s.min_excluding(1), 1.0);
        assert_eq!(s.min_excluding(0), -2.0);
    }

    #[test]
    fn min_excluding_handles_tied_minimum() {
        let s = prepared(&[1.0, 1.0, 4.0]);
        assert_eq!(s.min_excluding(0), 1.0);
        assert_eq!(s.min_excluding(1), 1.0);
    }

    #[test]
    fn least_two_orders_ascending() {
        let s = prepared(&[5.0, -3.0, -1.0, 2.0]);
        assert_eq!(s.least_two(), (-3.0, -1.0));
    }

    #[test]
    fn least_two_handles_duplicate_minimum() {
        let s = prepared(&[1.0, 1.0, 4.0]);
        assert_eq!(s.least_two(), (1.0, 1.0));
    }

    #[test]
    fn argmin_picks_lowest_index_on_tie() {
        let s = prepared(&[2.0, 1.0, 1.0]);
        assert_eq!(s.argmin(), Some(1));
    }

    #[test]
    fn lower_bound_is_the_minimum() {
        let s = prepared(&[2.0, -4.0, 1.0]);
        assert_eq!(s.lower_bound(), -4.0);
    }

    #[test]
    fn fresh_factor_is_not_prepared() {
        let s = SlottedFactor::new(3);
        assert!(!s.is_prepared());
    }
}
