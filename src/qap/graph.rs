//! The QAP factor graph: unaries with GM-style pairwise adjacency, plus a per-label link
//! into at most one uniqueness factor (the "this label is this column" constraint).

use crate::factors::{PairwiseFactor, SlottedFactor, UnaryFactor};
use crate::{index_type, Cost, Primal, SolverError};

index_type!(
    /// Identifies a unary node within a QAP [`Graph`].
    UnaryId
);
index_type!(
    /// Identifies a pairwise node within a QAP [`Graph`].
    PairwiseId
);
index_type!(
    /// Identifies a uniqueness node within a QAP [`Graph`].
    UniquenessId
);

/// One `(unary, label)` entry's membership in a uniqueness factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniquenessLink {
    pub uniqueness: UniquenessId,
    pub slot: usize,
}

pub(crate) struct UnaryNode {
    pub factor: UnaryFactor,
    pub forward: Vec<PairwiseId>,
    pub backward: Vec<PairwiseId>,
    /// Indexed by label; `None` when that label is not constrained by any uniqueness factor.
    pub uniqueness_links: Vec<Option<UniquenessLink>>,
}

pub(crate) struct PairwiseNode {
    pub factor: PairwiseFactor,
    pub unary0: UnaryId,
    pub unary1: UnaryId,
}

pub(crate) struct UniquenessNode {
    /// `K` linked `(unary, label)` edges plus one trailing "none selected" slot.
    pub factor: SlottedFactor,
    pub edges: Vec<(UnaryId, usize)>,
}

/// An arena-owned QAP factor graph.
pub struct Graph {
    pub(crate) unaries: Vec<UnaryNode>,
    pub(crate) pairwises: Vec<PairwiseNode>,
    pub(crate) uniquenesses: Vec<UniquenessNode>,
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
            uniquenesses: Vec::new(),
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

    pub fn num_uniquenesses(&self) -> usize {
        self.uniquenesses.len()
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
            uniqueness_links: vec![None; num_labels],
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

    /// Creates a uniqueness factor with `num_unary_edges` linkable slots plus one implicit
    /// trailing "none selected" slot.
    pub fn add_uniqueness(&mut self, num_unary_edges: usize) -> Result<UniquenessId, SolverError> {
        self.check_building()?;
        let id = UniquenessId(self.uniquenesses.len());
        self.uniquenesses.push(UniquenessNode {
            factor: SlottedFactor::new(num_unary_edges + 1),
            edges: Vec::with_capacity(num_unary_edges),
        });
        Ok(id)
    }

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

    /// Links `(unary, label)` into the next free slot of `uniqueness`.
    pub fn add_uniqueness_link(
        &mut self,
        unary: UnaryId,
        label: usize,
        uniqueness: UniquenessId,
    ) -> Result<(), SolverError> {
        self.check_building()?;
        let unary_node = self
            .unaries
            .get_mut(unary.index())
            .ok_or_else(|| SolverError::structural(format!("unknown unary {unary}")))?;
        if label >= unary_node.uniqueness_links.len() {
            return Err(SolverError::usage(format!(
                "label {label} out of range for unary {unary}"
            )));
        }
        if unary_node.uniqueness_links[label].is_some() {
            return Err(SolverError::structural(format!(
                "unary {unary} label {label} already linked to a uniqueness factor"
            )));
        }
        let uniqueness_node = self
            .uniquenesses
            .get_mut(uniqueness.index())
            .ok_or_else(|| SolverError::structural(format!("unknown uniqueness {uniqueness}")))?;
        let slot = uniqueness_node.edges.len();
        if slot + 1 >= uniqueness_node.factor.num_slots() {
            return Err(SolverError::structural(format!(
                "uniqueness {uniqueness} has no free slots left"
            )));
        }
        uniqueness_node.edges.push((unary, label));
        self.unaries[unary.index()].uniqueness_links[label] =
            Some(UniquenessLink { uniqueness, slot });
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

    pub fn set_uniqueness_cost(
        &mut self,
        uniqueness: UniquenessId,
        slot: usize,
        cost: Cost,
    ) -> Result<(), SolverError> {
        self.check_building()?;
        let node = self
            .uniquenesses
            .get_mut(uniqueness.index())
            .ok_or_else(|| SolverError::structural(format!("unknown uniqueness {uniqueness}")))?;
        if slot >= node.factor.num_slots() {
            return Err(SolverError::usage(format!(
                "slot {slot} out of range for uniqueness {uniqueness}"
            )));
        }
        node.factor.set(slot, cost);
        Ok(())
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
        for (idx, q) in self.uniquenesses.iter().enumerate() {
            if !q.factor.is_prepared() {
                return Err(SolverError::not_prepared(format!(
                    "uniqueness {idx} has an unset cost entry"
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

    pub(crate) fn uniqueness(&self, id: UniquenessId) -> Result<&UniquenessNode, SolverError> {
        self.uniquenesses
            .get(id.index())
            .ok_or_else(|| SolverError::structural(format!("unknown uniqueness {id}")))
    }

    pub(crate) fn uniqueness_mut(
        &mut self,
        id: UniquenessId,
    ) -> Result<&mut UniquenessNode, SolverError> {
        self.uniquenesses
            .get_mut(id.index())
            .ok_or_else(|| SolverError::structural(format!("unknown uniqueness {id}")))
    }

    pub fn unary_primal(&self, id: UnaryId) -> Primal {
        self.unaries[id.index()].factor.primal()
    }

    pub fn lower_bound(&self) -> Cost {
        let unary_lb: Cost = self.unaries.iter().map(|u| u.factor.lower_bound()).sum();
        let pairwise_lb: Cost = self.pairwises.iter().map(|p| p.factor.lower_bound()).sum();
        let uniqueness_lb: Cost = self.uniquenesses.iter().map(|q| q.factor.lower_bound()).sum();
        unary_lb + pairwise_lb + uniqueness_lb
    }

    /// `Σ factor.evaluate_primal()` over unaries, pairwises, and uniquenesses, plus `+∞` if
    /// any pairwise or uniqueness primal disagrees with its linked unaries' decided labels
    /// (see [`super::messages::check_consistency`]).
    pub fn evaluate_primal(&self) -> Cost {
        let unary_energy: Cost = self.unaries.iter().map(|u| u.factor.evaluate_primal()).sum();
        let pairwise_energy: Cost = self
            .pairwises
            .iter()
            .map(|p| p.factor.evaluate_primal())
            .sum();
        let uniqueness_energy: Cost = self
            .uniquenesses
            .iter()
            .map(|q| q.factor.evaluate_primal())
            .sum();
        let penalty = if super::messages::check_consistency(self).is_inconsistent() {
            Cost::INFINITY
        } else {
            0.0
        };
        unary_energy + pairwise_energy + uniqueness_energy + penalty
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_uniqueness_link_rejects_a_second_claim_on_the_same_label() {
        let mut g = Graph::new();
        let u = g.add_unary(2).unwrap();
        let q = g.add_uniqueness(1).unwrap();
        g.add_uniqueness_link(u, 0, q).unwrap();
        assert!(matches!(
            g.add_uniqueness_link(u, 0, q),
            Err(SolverError::StructuralError { .. })
        ));
    }

    #[test]
    fn finalize_requires_every_uniqueness_slot_prepared() {
        let mut g = Graph::new();
        let u0 = g.add_unary(1).unwrap();
        g.set_unary_cost(u0, 0, 0.0).unwrap();
        let q = g.add_uniqueness(1).unwrap();
        g.add_uniqueness_link(u0, 0, q).unwrap();
        // slot 1 ("none") never set
        g.set_uniqueness_cost(q, 0, 0.0).unwrap();
        assert!(matches!(g.finalize(), Err(SolverError::NotPrepared { .. })));
    }
}
