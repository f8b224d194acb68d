//! GM message kernel: receive, send, TRW-S-style rounding, primal propagation and the
//! consistency check, each parametrized on a sweep [`Direction`].
//!
//! A unary's `forward` adjacency always holds pairwises for which it is the `unary0`
//! endpoint, and `backward` the ones for which it is `unary1` — so an edge's *role* at a
//! unary (which side of the pairwise it is) is fixed by which list it came from, never by
//! the sweep direction being driven. `receive(direction)` drains mass from the list whose
//! role is the opposite of `direction`, using that list's own role (not `direction`) when
//! calling into the pairwise factor; using the sweep direction there instead would treat a
//! `unary1` neighbor's column as if it were a row and break the reparametrization
//! invariant. `send(direction)` pushes mass onto the list whose role equals `direction`,
//! where role and sweep direction coincide by construction.

use log::trace;

use crate::gm::graph::{Graph, UnaryId};
use crate::{Consistency, Cost, Direction, SolverError};

fn adjacency_for(graph: &Graph, u: UnaryId, direction: Direction) -> Result<Vec<super::PairwiseId>, SolverError> {
    let node = graph.unary(u)?;
    Ok(match direction {
        Direction::Forward => node.forward.clone(),
        Direction::Backward => node.backward.clone(),
    })
}

/// Drains mass from `u`'s `!direction`-role neighbors into `u`.
pub fn receive(graph: &mut Graph, direction: Direction, u: UnaryId) -> Result<(), SolverError> {
    let role = direction.flip();
    let edges = adjacency_for(graph, u, role)?;
    let num_labels = graph.unary(u)?.factor.num_labels();
    for p_id in edges {
        for l in 0..num_labels {
            let m = graph.pairwise(p_id)?.factor.min_marginal(role, l);
            trace!("gm::receive unary={u} pairwise={p_id} role={role:?} label={l} m={m}");
            graph.pairwise_mut(p_id)?.factor.repam(role, l, -m);
            graph.unary_mut(u)?.factor.repam(l, m);
        }
    }
    Ok(())
}

/// Pushes mass from `u` onto its `direction`-role neighbors, split proportionally across
/// `max(|forward|, |backward|)` remaining neighbors so the residual left in `u` stays
/// non-negative even when the two sides are unbalanced.
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
            trace!("gm::send unary={u} pairwise={p_id} role={direction:?} label={l} msg={msg}");
            graph.unary_mut(u)?.factor.repam(l, -msg);
            graph.pairwise_mut(p_id)?.factor.repam(direction, l, msg);
        }
        split -= 1.0;
    }
    Ok(())
}

/// Rounds `u`'s primal using its `!direction`-role neighbors' already-decided primals.
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

/// Copies `u`'s just-decided primal into every adjacent pairwise's matching slot.
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

/// Checks every pairwise's primal against its two endpoint unaries' primals and merges the
/// per-edge results into a single [`Consistency`] verdict for the whole graph.
pub fn check_consistency(graph: &Graph) -> Consistency {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gm::Graph;

    fn chain_of_three() -> (Graph, Vec<UnaryId>) {
        let mut g = Graph::new();
        let unaries: Vec<UnaryId> = (0..3).map(|_| g.add_unary(2).unwrap()).collect();
        let unary_costs = [[0.0, 1.0], [1.0, 0.0], [0.0, 1.0]];
        for (u, costs) in unaries.iter().zip(unary_costs) {
            g.set_unary_cost(*u, 0, costs[0]).unwrap();
            g.set_unary_cost(*u, 1, costs[1]).unwrap();
        }
        for i in 0..2 {
            let p = g.add_pairwise(2, 2).unwrap();
            g.add_pairwise_link(unaries[i], unaries[i + 1], p).unwrap();
            for l0 in 0..2 {
                for l1 in 0..2 {
                    let cost = if l0 == l1 { 0.0 } else { 1.0 };
                    g.set_pairwise_cost(p, l0, l1, cost).unwrap();
                }
            }
        }
        g.finalize().unwrap();
        (g, unaries)
    }

    #[test]
    fn receive_then_send_preserves_lower_bound_or_improves_it() {
        let (mut g, unaries) = chain_of_three();
        let lb_before = g.lower_bound();
        for &u in &unaries {
            receive(&mut g, Direction::Forward, u).unwrap();
            send(&mut g, Direction::Forward, u).unwrap();
        }
        assert!(g.lower_bound() >= lb_before - crate::EPSILON);
    }

    #[test]
    fn rounding_and_propagation_produce_a_consistent_primal_on_a_converged_chain() {
        let (mut g, unaries) = chain_of_three();
        for _ in 0..5 {
            for &u in &unaries {
                receive(&mut g, Direction::Forward, u).unwrap();
                send(&mut g, Direction::Forward, u).unwrap();
            }
            for &u in unaries.iter().rev() {
                receive(&mut g, Direction::Backward, u).unwrap();
                send(&mut g, Direction::Backward, u).unwrap();
            }
        }
        for &u in &unaries {
            round_primal(&mut g, Direction::Forward, u).unwrap();
            propagate_primal(&mut g, u).unwrap();
        }
        assert_eq!(check_consistency(&g), Consistency::Satisfied);
        assert!(g.evaluate_primal().is_finite());
    }
}
