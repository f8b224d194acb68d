//! The GM factor graph: an arena of unary and pairwise nodes plus directed adjacency.
//!
//! A pairwise node's `unary0` is its "forward" endpoint and `unary1` its "backward"
//! endpoint; this is recorded in both the pairwise node (for lookups during rounding) and
//! in the two endpoint unaries' own `forward`/`backward` adjacency lists, so a unary never
//! has to search for its role in a neighboring pairwise.

use crate::factors::{PairwiseFactor, UnaryFactor};
use crate::{index_type, Cost, Primal, SolverError};

index_type!(
    /// Identifies a unary node within a [`Graph`].
    UnaryId
);
index_type!(
    /// Identifies a pairwise node within a [`Graph`].
    PairwiseId
);

pub(crate) struct UnaryNode {
    pub factor: UnaryFactor,
    /// Pairwises for which this unary is `unary0`.
    pub forward: Vec<PairwiseId>,
    /// Pairwises for which this unary is `unary1`.
    pub backward: Vec<PairwiseId>,
}

pub(crate) struct PairwiseNode {
    pub factor: PairwiseFactor,
    pub unary0: UnaryId,
    pub unary1: UnaryId,
}

/// An arena-owned GM factor graph. Nodes are appended during construction; [`Graph::finalize`]
/// freezes structure and checks every cost table has been fully populated.
pub struct Graph {
    pub(crate) unaries: Vec<UnaryNode>,
    pub(crate) pairwises: Vec<PairwiseNode>,
    finalized: bool,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            unaries: Vec::new(),
            pairwises: Vec::new(),
            finalized: false,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn num_unaries(&self) -> usize {
        self.unaries.len()
    }

    pub fn num_pairwises(&self) -> usize {
        self.pairwises.len()
    }

    fn check_building(&self) -> Result<(), SolverError> {
        if self.finalized {
            return Err(SolverError::usage("graph mutated after finalize"));
        }
        Ok(())
    }

    pub fn add_unary(&mut self, num_labels: usize) -> Result<UnaryId, SolverError> {
        self.check_building()?;
        let id = UnaryId(self.unaries.len());
        self.unaries.push(UnaryNode {
            factor: UnaryFactor::new(num_labels),
            forward: Vec::new(),
            backward: Vec::new(),
        });
        Ok(id)
    }

    pub fn add_pairwise(
        &mut self,
        num_labels0: usize,
        num_labels1: usize,
    ) -> Result<PairwiseId, SolverError> {
        self.check_building()?;
        let id = PairwiseId(self.pairwises.len());
        self.pairwises.push(PairwiseNode {
            factor: PairwiseFactor::new(num_labels0, num_labels1),
            unary0: UnaryId(usize::MAX),
            unary1: UnaryId(usize::MAX),
        });
        Ok(id)
    }

    /// Links `pairwise` to its two endpoint unaries: `unary0` becomes its forward endpoint,
    /// `unary1` its backward endpoint. A pairwise may be linked exactly once.
    pub fn add_pairwise_link(
        &mut self,
        unary0: UnaryId,
        unary1: UnaryId,
        pairwise: PairwiseId,
    ) -> Result<(), SolverError> {
        self.check_building()?;
        let num_unaries = self.unaries.len();
        let pairwise_node = self
            .pairwises
            .get_mut(pairwise.index())
            .ok_or_else(|| SolverError::structural(format!("unknown pairwise {pairwise}")))?;
        if pairwise_node.unary0.index() != usize::MAX {
            return Err(SolverError::structural(format!(
                "pairwise {pairwise} linked more than once"
            )));
        }
        if unary0.index() >= num_unaries || unary1.index() >= num_unaries {
            return Err(SolverError::structural(
                "pairwise link references an unknown unary",
            ));
        }
        pairwise_node.unary0 = unary0;
        pairwise_node.unary1 = unary1;
        self.unaries[unary0.index()].forward.push(pairwise);
        self.unaries[unary1.index()].backward.push(pairwise);
        Ok(())
    }

    pub fn set_unary_cost(
        &mut self,
        unary: UnaryId,
        label: usize,
        cost: Cost,
    ) -> Result<(), SolverError> {
        self.check_building()?;
        self.unary_mut(unary)?.factor.set(label, cost)
    }

    pub fn set_pairwise_cost(
        &mut self,
        pairwise: PairwiseId,
        l0: usize,
        l1: usize,
        cost: Cost,
    ) -> Result<(), SolverError> {
        self.check_building()?;
        self.pairwise_mut(pairwise)?.factor.set(l0, l1, cost)
    }

    pub fn finalize(&mut self) -> Result<(), SolverError> {
        self.check_building()?;
        for (idx, u) in self.unaries.iter().enumerate() {
            if !u.factor.is_prepared() {
                return Err(SolverError::not_prepared(format!(
                    "unary {idx} has an unset cost entry"
                )));
            }
        }
        for (idx, p) in self.pairwises.iter().enumerate() {
            if p.unary0.index() == usize::MAX {
                return Err(SolverError::structural(format!(
                    "pairwise {idx} was never linked to its endpoints"
                )));
            }
            if !p.factor.is_prepared() {
                return Err(SolverError::not_prepared(format!(
                    "pairwise {idx} has an unset cost entry"
                )));
            }
        }
        self.finalized = true;
        Ok(())
    }

    pub(crate) fn unary(&self, id: UnaryId) -> Result<&UnaryNode, SolverError> {
        self.unaries
            .get(id.index())
            .ok_or_else(|| SolverError::structural(format!("unknown unary {id}")))
    }

    pub(crate) fn unary_mut(&mut self, id: UnaryId) -> Result<&mut UnaryNode, SolverError> {
        self.unaries
            .get_mut(id.index())
            .ok_or_else(|| SolverError::structural(format!("unknown unary {id}")))
    }

    pub(crate) fn pairwise(&self, id: PairwiseId) -> Result<&PairwiseNode, SolverError> {
        self.pairwises
            .get(id.index())
            .ok_or_else(|| SolverError::structural(format!("unknown pairwise {id}")))
    }

    pub(crate) fn pairwise_mut(&mut self, id: PairwiseId) -> Result<&mut PairwiseNode, SolverError> {
        self.pairwises
            .get_mut(id.index())
            .ok_or_else(|| SolverError::structural(format!("unknown pairwise {id}")))
    }

    pub fn unary_primal(&self, id: UnaryId) -> Primal {
        self.unaries[id.index()].factor.primal()
    }

    pub fn lower_bound(&self) -> Cost {
        let unary_lb: Cost = self.unaries.iter().map(|u| u.factor.lower_bound()).sum();
        let pairwise_lb: Cost = self.pairwises.iter().map(|p| p.factor.lower_bound()).sum();
        unary_lb + pairwise_lb
    }

    /// `Σ factor.evaluate_primal()`, plus `+∞` if any unary's primal disagrees with an
    /// adjacent pairwise's decided primal (see [`super::messages::check_consistency`]).
    pub fn evaluate_primal(&self) -> Cost {
        let unary_energy: Cost = self.unaries.iter().map(|u| u.factor.evaluate_primal()).sum();
        let pairwise_energy: Cost = self
            .pairwises
            .iter()
            .map(|p| p.factor.evaluate_primal())
            .sum();
        let penalty = if super::messages::check_consistency(self).is_inconsistent() {
            Cost::INFINITY
        } else {
            0.0
        };
        unary_energy + pairwise_energy + penalty
    }

    pub fn reset_primal(&mut self) {
        for u in &mut self.unaries {
            u.factor.reset_primal();
        }
        for p in &mut self.pairwises {
            p.factor.reset_primal();
        }
    }
}
