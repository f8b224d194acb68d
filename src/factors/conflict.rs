use crate::factors::SlottedFactor;
use crate::{Cost, Primal};

/// One detection's membership in a conflict factor.
///
/// `local_slot` is this edge's position in the conflict's own cost table (`0..num_slots`),
/// used to index [`ConflictFactor::get`] / [`ConflictFactor::repam`] directly. `ordinal` is
/// a different number: the position this conflict occupies in the *detection's own*
/// membership list (assigned by [`crate::factors::DetectionFactor::next_conflict_ordinal`]
/// at link time). The message-to-conflict weight divides by `detection.conflict_count() -
/// ordinal`, not by anything involving `local_slot`; the two indices are only ever equal by
/// coincidence for a detection's first link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictEdge {
    pub detection: usize,
    pub local_slot: usize,
    pub ordinal: usize,
}

/// A conflict factor: an at-most-one constraint over a set of detections, at most one of
/// which may be switched on.
#[derive(Debug, Clone)]
pub struct ConflictFactor {
    slots: SlottedFactor,
    edges: Vec<ConflictEdge>,
}

impl ConflictFactor {
    pub fn new(num_slots: usize) -> Self {
        Self {
            slots: SlottedFactor::new(num_slots),
            edges: Vec::with_capacity(num_slots),
        }
    }

    pub fn num_slots(&self) -> usize {
        self.slots.num_slots()
    }

    pub fn is_prepared(&self) -> bool {
        self.slots.is_prepared() && self.edges.len() == self.slots.num_slots()
    }

    /// Links the next free slot to `detection`, tagging it with `ordinal` (the detection's
    /// own running conflict-membership count at link time). Returns the assigned local slot.
    pub fn link(&mut self, detection: usize, ordinal: usize) -> usize {
        let local_slot = self.edges.len();
        assert!(
            local_slot < self.slots.num_slots(),
            "conflict factor has no free slots left"
        );
        self.edges.push(ConflictEdge {
            detection,
            local_slot,
            ordinal,
        });
        local_slot
    }

    pub fn edges(&self) -> &[ConflictEdge] {
        &self.edges
    }

    pub fn set(&mut self, slot: usize, cost: Cost) {
        self.slots.set(slot, cost);
    }

    pub fn get(&self, slot: usize) -> Cost {
        self.slots.get(slot)
    }

    pub fn repam(&mut self, slot: usize, msg: Cost) {
        self.slots.repam(slot, msg);
    }

    pub fn lower_bound(&self) -> Cost {
        self.slots.lower_bound()
    }

    pub fn least_two(&self) -> (Cost, Cost) {
        self.slots.least_two()
    }

    /// The slot currently cheapest, i.e. the conflict's own rounding of "which detection (if
    /// any) stays on". `None` only for a conflict with zero slots.
    pub fn argmin(&self) -> Option<usize> {
        self.slots.argmin()
    }

    pub fn primal(&self) -> Primal {
        self.slots.primal()
    }

    pub fn reset_primal(&mut self) {
        self.slots.reset_primal();
    }

    pub fn set_primal(&mut self, slot: usize) {
        self.slots.set_primal(slot);
    }

    pub fn evaluate_primal(&self) -> Cost {
        self.slots.evaluate_primal()
    }
}
