//! QAP message kernel: a GM-style pairwise pass (identical orientation rules to
//! [`crate::gm::messages`]) plus a uniqueness pass that equalizes cost between a unary's
//! label and the uniqueness factor's matching slot.
//!
//! Unlike the CT conflict kernel, a `(unary, label)` pair links to at most one uniqueness
//! factor, so there is no ordinal weight schedule to compute: the GM pattern applies
//! directly with an implicit split of one.

use log::trace;

use crate::qap::graph::{Graph, UnaryId, UniquenessId};
use crate::{Consistency, Cost, Direction, SolverError};

fn adjacency_for(graph: &Graph, u: UnaryId, direction: Direction) -> Result<Vec<super::PairwiseId>, SolverError> {
    let node = graph.unary(u)?;
    Ok(match direction {
        Direction::Forward => node.forward.clone(),
        Direction::Backward => node.backward.clone(),
    })
}

/// Drains mass from `u`'s `!direction`-role pairwise neighbors into `u`. Identical in
/// spirit to [`crate::gm::messages::receive`]; see that module's docs for why the role
/// used against the pairwise factor is the list's own role, not the sweep direction.
pub fn receive(graph: &mut Graph, direction: Direction, u: UnaryId) -> Result<(), SolverError> {
    let role = direction.flip();
    let edges = adjacency_for(graph, u, role)?;
    let num_labels = graph.unary(u)?.factor.num_labels();
    for p_id in edges {
        for l in 0..num_labels {
            let m = graph.pairwise(p_id)?.factor.min_marginal(role, l);
            graph.pairwise_mut(p_id)?.factor.repam(role, l, -m);
            graph.unary_mut(u)?.factor.repam(l, m);
        }
    }
    Ok(())
}

/// Pushes mass from `u` onto its `direction`-role pairwise neighbors.
pub fn send(graph: &mut Graph, direction: Direction, u: UnaryId) -> Result<(), SolverError> {
    let edges = adjacency_for(graph, u, direction)?;
    if edges.is_empty() {
        return Ok(());
    }
    let node = graph.unary(u)?;
    let mut split = node.forward.len().max(node.backward.len()) as Cost;
    let num_labels = node.factor.num_labels();
    for p_id in edges {
        for l in 0..num_labels {
            let msg = graph.unary(u)?.factor.get(l) / split;
            graph.unary_mut(u)?.factor.repam(l, -msg);
            graph.pairwise_mut(p_id)?.factor.repam(direction, l, msg);
        }
        split -= 1.0;
    }
    Ok(())
}

pub fn round_primal(graph: &mut Graph, direction: Direction, u: UnaryId) -> Result<(), SolverError> {
    let role = direction.flip();
    let edges = adjacency_for(graph, u, role)?;
    let num_labels = graph.unary(u)?.factor.num_labels();

    let mut best_label = 0;
    let mut best_cost = Cost::INFINITY;
    for label in 0..num_labels {
        let mut cost = graph.unary(u)?.factor.get(label);
        for &p_id in &edges {
            let p = graph.pairwise(p_id)?;
            let (neighbor, query) = match role {
                Direction::Forward => (p.unary1, |p: &crate::factors::PairwiseFactor, j, label| p.get(label, j)),
                Direction::Backward => (p.unary0, |p: &crate::factors::PairwiseFactor, j, label| p.get(j, label)),
            };
            let neighbor_primal = graph.unary(neighbor)?.factor.primal();
            if let Some(j) = neighbor_primal.get() {
                cost += query(&p.factor, j, label);
            }
        }
        if cost < best_cost {
            best_cost = cost;
            best_label = label;
        }
    }
    graph.unary_mut(u)?.factor.set_primal(best_label);
    Ok(())
}

pub fn propagate_primal(graph: &mut Graph, u: UnaryId) -> Result<(), SolverError> {
    let label = graph.unary(u)?.factor.primal().get();
    let Some(label) = label else {
        return Ok(());
    };
    let forward = graph.unary(u)?.forward.clone();
    let backward = graph.unary(u)?.backward.clone();
    for p_id in forward {
        graph.pairwise_mut(p_id)?.factor.set_primal0(label);
    }
    for p_id in backward {
        graph.pairwise_mut(p_id)?.factor.set_primal1(label);
    }
    Ok(())
}

/// Pulls each linked `(unary, label)` cost entirely into its uniqueness slot.
pub fn send_to_uniqueness(graph: &mut Graph, q: UniquenessId) -> Result<(), SolverError> {
    let edges = graph.uniqueness(q)?.edges.clone();
    for (unary, label) in edges {
        let slot = graph
            .unary(unary)?
            .uniqueness_links[label]
            .expect("edge recorded on the uniqueness factor but missing on the unary")
            .slot;
        let m = graph.unary(unary)?.factor.get(label);
        trace!("qap::send_to_uniqueness unary={unary} label={label} uniqueness={q} slot={slot} m={m}");
        graph.unary_mut(unary)?.factor.repam(label, -m);
        graph.uniqueness_mut(q)?.factor.repam(slot, m);
    }
    Ok(())
}

/// Sends each slot's "what the rest of the constraint offers" back to its unary.
pub fn send_to_unaries(graph: &mut Graph, q: UniquenessId) -> Result<(), SolverError> {
    let edges = graph.uniqueness(q)?.edges.clone();
    for (unary, label) in edges {
        let slot = graph.unary(unary)?.uniqueness_links[label].unwrap().slot;
        let m = graph.uniqueness(q)?.factor.min_excluding(slot);
        trace!("qap::send_to_unaries unary={unary} label={label} uniqueness={q} slot={slot} m={m}");
        graph.uniqueness_mut(q)?.factor.repam(slot, -m);
        graph.unary_mut(unary)?.factor.repam(label, m);
    }
    Ok(())
}

/// Checks every pairwise's primal against its two endpoint unaries' primals, the same
/// check [`crate::gm::messages::check_consistency`] runs for the GM family.
fn check_pairwise_consistency(graph: &Graph) -> Consistency {
    let mut verdict = Consistency::Satisfied;
    for p in &graph.pairwises {
        let primal = p.factor.primal();
        let u0 = graph.unaries[p.unary0.index()].factor.primal();
        let u1 = graph.unaries[p.unary1.index()].factor.primal();
        let edge_verdict = match (primal.left.get(), primal.right.get(), u0.get(), u1.get()) {
            (Some(l0), Some(l1), Some(a0), Some(a1)) => {
                if l0 == a0 && l1 == a1 {
                    Consistency::Satisfied
                } else {
                    Consistency::Inconsistent
                }
            }
            _ => Consistency::Unknown,
        };
        verdict = verdict.merge(edge_verdict);
    }
    verdict
}

/// Checks one uniqueness factor's primal slot against which linked `(unary, label)` edge,
/// if any, the unary actually selected.
fn check_uniqueness_consistency(graph: &Graph, q: UniquenessId) -> Result<Consistency, SolverError> {
    let node = graph.uniqueness(q)?;
    let Some(primal_slot) = node.factor.primal().get() else {
        return Ok(Consistency::Unknown);
    };
    let mut verdict = Consistency::Satisfied;
    for (slot, &(unary, label)) in node.edges.iter().enumerate() {
        let Some(chosen) = graph.unary(unary)?.factor.primal().get() else {
            return Ok(Consistency::Unknown);
        };
        let selected = chosen == label;
        let should_be_selected = slot == primal_slot;
        if selected != should_be_selected {
            verdict = Consistency::Inconsistent;
        }
    }
    Ok(verdict)
}

/// Merges the pairwise check and every uniqueness factor's check into one graph-wide verdict.
pub fn check_consistency(graph: &Graph) -> Consistency {
    let mut verdict = check_pairwise_consistency(graph);
    for idx in 0..graph.num_uniquenesses() {
        let edge_verdict = check_uniqueness_consistency(graph, UniquenessId(idx))
            .expect("uniqueness id built from the graph's own uniqueness count is always valid");
        verdict = verdict.merge(edge_verdict);
    }
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qap::Graph;

    fn two_by_two_assignment() -> (Graph, Vec<UnaryId>) {
        let mut g = Graph::new();
        let unaries: Vec<UnaryId> = (0..2).map(|_| g.add_unary(2).unwrap()).collect();
        let costs = [[0.0, 5.0], [5.0, 0.0]];
        for (u, row) in unaries.iter().zip(costs) {
            g.set_unary_cost(*u, 0, row[0]).unwrap();
            g.set_unary_cost(*u, 1, row[1]).unwrap();
        }
        for label in 0..2 {
            let q = g.add_uniqueness(2).unwrap();
            for &u in &unaries {
                g.add_uniqueness_link(u, label, q).unwrap();
            }
            for slot in 0..3 {
                g.set_uniqueness_cost(q, slot, 0.0).unwrap();
            }
        }
        g.finalize().unwrap();
        (g, unaries)
    }

    #[test]
    fn uniqueness_messages_preserve_the_lower_bound() {
        let (mut g, _) = two_by_two_assignment();
        let lb_before = g.lower_bound();
        for q in 0..g.num_uniquenesses() {
            let q = UniquenessId(q);
            send_to_uniqueness(&mut g, q).unwrap();
            send_to_unaries(&mut g, q).unwrap();
        }
        assert!(g.lower_bound() >= lb_before - crate::EPSILON);
    }
}
