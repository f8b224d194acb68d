//! External ILP fallback. The solver hands a [`FactorVisitor`] over its own factors to a
//! registered [`MipAdapter`], which is expected to emit one binary variable per
//! (unary,label)/(pairwise,label-pair)/(uniqueness,slot), tie them together with equality
//! constraints, run an external MIP, and write the winning labels back as primals.
//!
//! No concrete adapter ships here; the commercial solver it would wrap is out of scope.

use crate::{Cost, SolverError};

/// Emits one callback per factor a MIP adapter needs to model.
pub trait FactorVisitor {
    fn visit_unary(&mut self, unary: usize, label: usize, cost: Cost);
    fn visit_pairwise(&mut self, pairwise: usize, label0: usize, label1: usize, cost: Cost);
    fn visit_uniqueness(&mut self, uniqueness: usize, slot: usize, cost: Cost);
}

/// An external MIP solver capable of exactly solving the visited factor graph.
///
/// Implementations live outside this crate; `solve` is expected to call back into the
/// graph (through whatever handle it was registered with) to write the winning labels as
/// primals before returning.
pub trait MipAdapter {
    fn solve(&mut self, visitor: &mut dyn FactorVisitor) -> Result<(), SolverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingVisitor {
        unaries: usize,
        pairwises: usize,
        uniquenesses: usize,
    }

    impl FactorVisitor for CountingVisitor {
        fn visit_unary(&mut self, _unary: usize, _label: usize, _cost: Cost) {
            self.unaries += 1;
        }
        fn visit_pairwise(&mut self, _pairwise: usize, _label0: usize, _label1: usize, _cost: Cost) {
            self.pairwises += 1;
        }
        fn visit_uniqueness(&mut self, _uniqueness: usize, _slot: usize, _cost: Cost) {
            self.uniquenesses += 1;
        }
    }

    struct NoOpAdapter;

    impl MipAdapter for NoOpAdapter {
        fn solve(&mut self, visitor: &mut dyn FactorVisitor) -> Result<(), SolverError> {
            visitor.visit_unary(0, 0, 1.0);
            Ok(())
        }
    }

    #[test]
    fn adapter_drives_the_visitor_it_is_handed() {
        let mut adapter = NoOpAdapter;
        let mut visitor = CountingVisitor {
            unaries: 0,
            pairwises: 0,
            uniquenesses: 0,
        };
        adapter.solve(&mut visitor).unwrap();
        assert_eq!(visitor.unaries, 1);
        assert_eq!(visitor.pairwises, 0);
    }
}
