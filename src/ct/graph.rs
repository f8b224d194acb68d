//! The CT factor graph: detections (on/off, with a bank of on-states) linked into conflict
//! factors (at most one linked detection may be on).

use crate::factors::{ConflictFactor, DetectionFactor, DetectionPrimal};
use crate::{index_type, Cost, SolverError};

index_type!(
    /// Identifies a detection node within a CT [`Graph`].
    DetectionId
);
index_type!(
    /// Identifies a conflict node within a CT [`Graph`].
    ConflictId
);

pub(crate) struct DetectionNode {
    pub factor: DetectionFactor,
    pub conflicts: Vec<ConflictId>,
}

pub(crate) struct ConflictNode {
    pub factor: ConflictFactor,
}

/// An arena-owned CT factor graph.
pub struct Graph {
    pub(crate) detections: Vec<DetectionNode>,
    pub(crate) conflicts: Vec<ConflictNode>,
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
            detections: Vec::new(),
            conflicts: Vec::new(),
            finalized: false,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn num_detections(&self) -> usize {
        self.detections.len()
    }

    pub fn num_conflicts(&self) -> usize {
        self.conflicts.len()
    }

    fn check_building(&self) -> Result<(), SolverError> {
        if self.finalized {
            return Err(SolverError::usage("graph mutated after finalize"));
        }
        Ok(())
    }

    pub fn add_detection(&mut self, num_on_states: usize) -> Result<DetectionId, SolverError> {
        self.check_building()?;
        let id = DetectionId(self.detections.len());
        self.detections.push(DetectionNode {
            factor: DetectionFactor::new(num_on_states),
            conflicts: Vec::new(),
        });
        Ok(id)
    }

    /// Creates a conflict factor with `num_detections` linkable slots plus one implicit
    /// trailing "all off" slot.
    pub fn add_conflict(&mut self, num_detections: usize) -> Result<ConflictId, SolverError> {
        self.check_building()?;
        let id = ConflictId(self.conflicts.len());
        self.conflicts.push(ConflictNode {
            factor: ConflictFactor::new(num_detections + 1),
        });
        Ok(id)
    }

    /// Links `detection` into the next free slot of `conflict`, tagging the edge with the
    /// detection's own running conflict-membership ordinal. See
    /// [`crate::factors::ConflictEdge`] for why that ordinal (not the slot assigned here)
    /// drives the message weight formula.
    pub fn add_conflict_link(
        &mut self,
        detection: DetectionId,
        conflict: ConflictId,
    ) -> Result<(), SolverError> {
        self.check_building()?;
        let detection_node = self
            .detections
            .get_mut(detection.index())
            .ok_or_else(|| SolverError::structural(format!("unknown detection {detection}")))?;
        let ordinal = detection_node.factor.next_conflict_ordinal();
        detection_node.conflicts.push(conflict);
        let conflict_node = self
            .conflicts
            .get_mut(conflict.index())
            .ok_or_else(|| SolverError::structural(format!("unknown conflict {conflict}")))?;
        conflict_node.factor.link(detection.index(), ordinal);
        Ok(())
    }

    pub fn set_detection_off_cost(
        &mut self,
        detection: DetectionId,
        cost: Cost,
    ) -> Result<(), SolverError> {
        self.check_building()?;
        self.detection_mut(detection)?.factor.set_off_cost(cost);
        Ok(())
    }

    pub fn set_detection_on_cost(
        &mut self,
        detection: DetectionId,
        state: usize,
        cost: Cost,
    ) -> Result<(), SolverError> {
        self.check_building()?;
        let node = self.detection_mut(detection)?;
        if state >= node.factor.num_on_states() {
            return Err(SolverError::usage(format!(
                "on-state {state} out of range for detection {detection}"
            )));
        }
        node.factor.set_on_cost(state, cost);
        Ok(())
    }

    pub fn set_conflict_cost(
        &mut self,
        conflict: ConflictId,
        slot: usize,
        cost: Cost,
    ) -> Result<(), SolverError> {
        self.check_building()?;
        let node = self.conflict_mut(conflict)?;
        if slot >= node.factor.num_slots() {
            return Err(SolverError::usage(format!(
                "slot {slot} out of range for conflict {conflict}"
            )));
        }
        node.factor.set(slot, cost);
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<(), SolverError> {
        self.check_building()?;
        for (idx, d) in self.detections.iter().enumerate() {
            if !d.factor.is_prepared() {
                return Err(SolverError::not_prepared(format!(
                    "detection {idx} has an unset cost entry"
                )));
            }
        }
        for (idx, c) in self.conflicts.iter().enumerate() {
            if !c.factor.is_prepared() {
                return Err(SolverError::not_prepared(format!(
                    "conflict {idx} was never fully linked or costed"
                )));
            }
        }
        self.finalized = true;
        Ok(())
    }

    pub(crate) fn detection(&self, id: DetectionId) -> Result<&DetectionNode, SolverError> {
        self.detections
            .get(id.index())
            .ok_or_else(|| SolverError::structural(format!("unknown detection {id}")))
    }

    pub(crate) fn detection_mut(&mut self, id: DetectionId) -> Result<&mut DetectionNode, SolverError> {
        self.detections
            .get_mut(id.index())
            .ok_or_else(|| SolverError::structural(format!("unknown detection {id}")))
    }

    pub(crate) fn conflict(&self, id: ConflictId) -> Result<&ConflictNode, SolverError> {
        self.conflicts
            .get(id.index())
            .ok_or_else(|| SolverError::structural(format!("unknown conflict {id}")))
    }

    pub(crate) fn conflict_mut(&mut self, id: ConflictId) -> Result<&mut ConflictNode, SolverError> {
        self.conflicts
            .get_mut(id.index())
            .ok_or_else(|| SolverError::structural(format!("unknown conflict {id}")))
    }

    pub fn detection_primal(&self, id: DetectionId) -> DetectionPrimal {
        self.detections[id.index()].factor.primal()
    }

    pub fn lower_bound(&self) -> Cost {
        let detection_lb: Cost = self.detections.iter().map(|d| d.factor.lower_bound()).sum();
        let conflict_lb: Cost = self.conflicts.iter().map(|c| c.factor.lower_bound()).sum();
        detection_lb + conflict_lb
    }

    /// `Σ factor.evaluate_primal()`, plus `+∞` if any conflict's primal disagrees with its
    /// linked detections' on/off primals (see [`super::messages::check_consistency`]).
    pub fn evaluate_primal(&self) -> Cost {
        let detection_energy: Cost = self
            .detections
            .iter()
            .map(|d| d.factor.evaluate_primal())
            .sum();
        let conflict_energy: Cost = self
            .conflicts
            .iter()
            .map(|c| c.factor.evaluate_primal())
            .sum();
        let penalty = if super::messages::check_consistency(self).is_inconsistent() {
            Cost::INFINITY
        } else {
            0.0
        };
        detection_energy + conflict_energy + penalty
    }

    pub fn reset_primal(&mut self) {
        for d in &mut self.detections {
            d.factor.reset_primal();
        }
        for c in &mut self.conflicts {
            c.factor.reset_primal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_conflict_link_assigns_increasing_ordinals() {
        let mut g = Graph::new();
        let d0 = g.add_detection(1).unwrap();
        let c0 = g.add_conflict(1).unwrap();
        let c1 = g.add_conflict(1).unwrap();
        g.add_conflict_link(d0, c0).unwrap();
        g.add_conflict_link(d0, c1).unwrap();
        assert_eq!(g.conflict(c0).unwrap().factor.edges()[0].ordinal, 0);
        assert_eq!(g.conflict(c1).unwrap().factor.edges()[0].ordinal, 1);
    }

    #[test]
    fn finalize_requires_every_conflict_slot_linked() {
        let mut g = Graph::new();
        let d0 = g.add_detection(1).unwrap();
        g.set_detection_off_cost(d0, 0.0).unwrap();
        g.set_detection_on_cost(d0, 0, 0.0).unwrap();
        let c0 = g.add_conflict(2).unwrap();
        g.add_conflict_link(d0, c0).unwrap();
        for slot in 0..3 {
            g.set_conflict_cost(c0, slot, 0.0).unwrap();
        }
        assert!(matches!(g.finalize(), Err(SolverError::NotPrepared { .. })));
    }
}
