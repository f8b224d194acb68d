//! Snapshot/restore of a consistent QAP primal across unary, pairwise, and uniqueness
//! factors, following the original solver's restore algorithm: unary primals are the only
//! ones actually saved; uniqueness and pairwise primals are always rederived from them.

use crate::qap::graph::{Graph, PairwiseId, UnaryId, UniquenessId};
use crate::Primal;

/// A saved snapshot of every unary's primal label.
#[derive(Debug, Clone, Default)]
pub struct PrimalStorage {
    unary_primals: Vec<Primal>,
}

impl PrimalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every unary's current primal into this buffer, in graph order.
    pub fn save(&mut self, graph: &Graph) {
        self.unary_primals = (0..graph.num_unaries())
            .map(|i| graph.unary_primal(UnaryId(i)))
            .collect();
    }

    /// Restores the saved unary primals and rederives uniqueness and pairwise primals:
    /// each uniqueness defaults to its trailing "none" slot, overwritten with the slot of
    /// the first linked unary whose restored label matches; pairwise primals are always
    /// reset before being rebuilt from their two endpoints' unary primals.
    pub fn restore(&self, graph: &mut Graph) {
        graph.reset_primal();

        for (i, &primal) in self.unary_primals.iter().enumerate() {
            if let Some(label) = primal.get() {
                graph.unary_mut(UnaryId(i)).unwrap().factor.set_primal(label);
            }
        }

        for q in 0..graph.num_uniquenesses() {
            let q = UniquenessId(q);
            let node = graph.uniqueness_mut(q).unwrap();
            node.factor.reset_primal();
            let edges = node.edges.clone();
            let none_slot = node.factor.num_slots() - 1;
            let mut matched = false;
            for (slot, (unary, label)) in edges.into_iter().enumerate() {
                let unary_label = graph.unary(unary).unwrap().factor.primal().get();
                if unary_label == Some(label) {
                    graph.uniqueness_mut(q).unwrap().factor.set_primal(slot);
                    matched = true;
                    break;
                }
            }
            if !matched {
                graph.uniqueness_mut(q).unwrap().factor.set_primal(none_slot);
            }
        }

        for p in 0..graph.num_pairwises() {
            let p = PairwiseId(p);
            let node = graph.pairwise(p).unwrap();
            let (unary0, unary1) = (node.unary0, node.unary1);
            let label0 = graph.unary(unary0).unwrap().factor.primal().get();
            let label1 = graph.unary(unary1).unwrap().factor.primal().get();
            let node = graph.pairwise_mut(p).unwrap();
            if let Some(l0) = label0 {
                node.factor.set_primal0(l0);
            }
            if let Some(l1) = label1 {
                node.factor.set_primal1(l1);
            }
        }
    }
}
