//! CT conflict message kernel.
//!
//! `send_messages_to_conflict` divides each detection's contribution by
//! `conflicts(d) - ordinal`, where `ordinal` is the position this conflict occupies in
//! `d`'s *own* membership list (assigned at link time), not this edge's slot within the
//! conflict's own table. Reading the denominator as the local slot instead makes the
//! formula divide by zero or go negative whenever a detection's own slot happens to equal
//! its total conflict count minus something — the ordinal reading is the one that keeps
//! every step's weight in `(0, 1]` and reproduces the documented worked example exactly.

use log::trace;

use crate::ct::graph::{ConflictId, DetectionId, Graph};
use crate::{Consistency, Cost, SolverError};

/// Pulls each linked detection's `min_detection()` into the conflict, weighted by how many
/// of that detection's OTHER conflicts still owe it mass (`conflicts(d) - ordinal`).
pub fn send_messages_to_conflict(graph: &mut Graph, c: ConflictId) -> Result<(), SolverError> {
    let edges = graph.conflict(c)?.factor.edges().to_vec();
    for edge in edges {
        let detection = DetectionId(edge.detection);
        let total = graph.detection(detection)?.factor.conflict_count();
        let weight = 1.0 / (total - edge.ordinal) as Cost;
        let msg = graph.detection(detection)?.factor.min_detection() * weight;
        trace!(
            "ct::send_to_conflict conflict={c} detection={detection} slot={} ordinal={} weight={weight} msg={msg}",
            edge.local_slot, edge.ordinal
        );
        graph.detection_mut(detection)?.factor.repam_detection(-msg);
        graph.conflict_mut(c)?.factor.repam(edge.local_slot, msg);
    }
    Ok(())
}

/// Redistributes the conflict's two smallest slot costs back to their detections, clamped
/// so the implicit "all off" slot never becomes attractive below zero.
pub fn send_messages_to_detection(graph: &mut Graph, c: ConflictId) -> Result<(), SolverError> {
    let edges = graph.conflict(c)?.factor.edges().to_vec();
    let (first, second) = graph.conflict(c)?.factor.least_two();
    let m = (0.5 * (first + second)).min(0.0);
    for edge in edges {
        let detection = DetectionId(edge.detection);
        let slot_cost = graph.conflict(c)?.factor.get(edge.local_slot);
        let msg = slot_cost - m;
        trace!("ct::send_to_detection conflict={c} detection={detection} slot={} msg={msg}", edge.local_slot);
        graph.conflict_mut(c)?.factor.repam(edge.local_slot, -msg);
        graph.detection_mut(detection)?.factor.repam_detection(msg);
    }
    Ok(())
}

/// Sets `c`'s primal to whichever linked detection is on, or the "all off" slot otherwise.
pub fn propagate_primal_to_conflict(graph: &mut Graph, c: ConflictId) -> Result<(), SolverError> {
    let edges = graph.conflict(c)?.factor.edges().to_vec();
    let none_slot = graph.conflict(c)?.factor.num_slots() - 1;
    for edge in &edges {
        let detection = DetectionId(edge.detection);
        if graph.detection(detection)?.factor.primal().is_on() {
            graph.conflict_mut(c)?.factor.set_primal(edge.local_slot);
            return Ok(());
        }
    }
    graph.conflict_mut(c)?.factor.set_primal(none_slot);
    Ok(())
}

/// If `c`'s primal names a real detection slot, forces every other linked detection off.
pub fn propagate_primal_to_detections(graph: &mut Graph, c: ConflictId) -> Result<(), SolverError> {
    let Some(primal_slot) = graph.conflict(c)?.factor.primal().get() else {
        return Ok(());
    };
    let edges = graph.conflict(c)?.factor.edges().to_vec();
    for edge in edges {
        if edge.local_slot != primal_slot {
            let detection = DetectionId(edge.detection);
            graph.detection_mut(detection)?.factor.set_off();
        }
    }
    Ok(())
}

/// Merges [`check_primal_consistency`] across every conflict in the graph.
pub fn check_consistency(graph: &Graph) -> Consistency {
    let mut verdict = Consistency::Satisfied;
    for idx in 0..graph.num_conflicts() {
        let edge_verdict = check_primal_consistency(graph, ConflictId(idx))
            .expect("conflict id built from the graph's own conflict count is always valid");
        verdict = verdict.merge(edge_verdict);
    }
    verdict
}

/// Checks one conflict's primal against its linked detections' primals.
pub fn check_primal_consistency(graph: &Graph, c: ConflictId) -> Result<Consistency, SolverError> {
    let conflict = &graph.conflict(c)?.factor;
    let Some(primal_slot) = conflict.primal().get() else {
        return Ok(Consistency::Unknown);
    };
    let mut verdict = Consistency::Satisfied;
    for edge in conflict.edges() {
        let detection = DetectionId(edge.detection);
        let on = match graph.detection(detection)?.factor.primal() {
            crate::factors::DetectionPrimal::Undecided => return Ok(Consistency::Unknown),
            other => other.is_on(),
        };
        let should_be_on = edge.local_slot == primal_slot;
        if on != should_be_on {
            verdict = Consistency::Inconsistent;
        }
    }
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ct::Graph;

    fn two_detection_conflict() -> (Graph, ConflictId) {
        let mut g = Graph::new();
        let d0 = g.add_detection(1).unwrap();
        let d1 = g.add_detection(1).unwrap();
        g.set_detection_off_cost(d0, 0.0).unwrap();
        g.set_detection_on_cost(d0, 0, -3.0).unwrap();
        g.set_detection_off_cost(d1, 0.0).unwrap();
        g.set_detection_on_cost(d1, 0, -1.0).unwrap();

        let c = g.add_conflict(2).unwrap();
        g.add_conflict_link(d0, c).unwrap();
        g.add_conflict_link(d1, c).unwrap();
        for slot in 0..3 {
            g.set_conflict_cost(c, slot, 0.0).unwrap();
        }
        g.finalize().unwrap();
        (g, c)
    }

    #[test]
    fn worked_example_reaches_the_documented_local_lower_bound() {
        let (mut g, c) = two_detection_conflict();
        send_messages_to_conflict(&mut g, c).unwrap();
        send_messages_to_detection(&mut g, c).unwrap();
        assert!((g.lower_bound() - (-3.0)).abs() < 1e-9);
    }

    #[test]
    fn worked_example_primal_propagation_picks_detection_zero() {
        let (mut g, c) = two_detection_conflict();
        send_messages_to_conflict(&mut g, c).unwrap();
        send_messages_to_detection(&mut g, c).unwrap();

        let d0 = DetectionId(0);
        let d1 = DetectionId(1);
        g.detection_mut(d0).unwrap().factor.round_primal();
        g.detection_mut(d1).unwrap().factor.round_primal();

        assert!(g.detection_primal(d0).is_on());
        assert!(g.detection_primal(d1).is_off());

        propagate_primal_to_conflict(&mut g, c).unwrap();
        propagate_primal_to_detections(&mut g, c).unwrap();
        assert_eq!(check_primal_consistency(&g, c).unwrap(), Consistency::Satisfied);
        assert_eq!(check_consistency(&g), Consistency::Satisfied);
        assert!(g.evaluate_primal().is_finite());
    }

    #[test]
    fn evaluate_primal_is_infinite_when_a_detection_contradicts_the_conflict() {
        let (mut g, c) = two_detection_conflict();
        send_messages_to_conflict(&mut g, c).unwrap();
        send_messages_to_detection(&mut g, c).unwrap();

        // Force both detections on, directly contradicting the at-most-one conflict.
        g.detection_mut(DetectionId(0)).unwrap().factor.set_on(0);
        g.detection_mut(DetectionId(1)).unwrap().factor.set_on(0);
        g.conflict_mut(c).unwrap().factor.set_primal(0);

        assert_eq!(check_consistency(&g), Consistency::Inconsistent);
        assert_eq!(g.evaluate_primal(), Cost::INFINITY);
    }
}
