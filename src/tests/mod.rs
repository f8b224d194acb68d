//! End-to-end scenarios spanning graph construction, solving, and primal rounding for each
//! problem family, plus the universal properties every kernel must uphold regardless of
//! family.

use rstest::rstest;

use crate::ct::Graph as CtGraph;
use crate::gm::Graph as GmGraph;
use crate::qap::{Graph as QapGraph, PrimalStorage};
use crate::options::SolverOptions;
use crate::solver::{SolverDriver, SolverHooks};
use crate::{Consistency, SolverError};

fn gm_chain_of_three() -> GmGraph {
    let mut g = GmGraph::new();
    let unaries: Vec<_> = (0..3).map(|_| g.add_unary(2).unwrap()).collect();
    let unary_costs = [[0.0, 1.0], [1.0, 0.0], [0.0, 1.0]];
    for (u, row) in unaries.iter().zip(unary_costs) {
        g.set_unary_cost(*u, 0, row[0]).unwrap();
        g.set_unary_cost(*u, 1, row[1]).unwrap();
    }
    for w in unaries.windows(2) {
        let p = g.add_pairwise(2, 2).unwrap();
        g.add_pairwise_link(w[0], w[1], p).unwrap();
        for l0 in 0..2 {
            for l1 in 0..2 {
                let cost = if l0 == l1 { 0.0 } else { 1.0 };
                g.set_pairwise_cost(p, l0, l1, cost).unwrap();
            }
        }
    }
    g.finalize().unwrap();
    g
}

#[test]
fn gm_chain_of_three_converges_to_the_documented_bound_and_primal() {
    use crate::gm::GmSolver;

    let graph = gm_chain_of_three();
    let mut solver = GmSolver::new(graph, SolverOptions::default());
    let mut hooks = SolverHooks::none();
    solver.run(5, &mut hooks).unwrap();

    assert!((solver.lower_bound() - 1.0).abs() < 1e-6);
    assert!((solver.evaluate_primal() - 1.0).abs() < 1e-6);
}

#[test]
fn gm_single_pairwise_has_zero_bound_and_zero_primal() {
    use crate::gm::GmSolver;

    let mut g = GmGraph::new();
    let u0 = g.add_unary(2).unwrap();
    let u1 = g.add_unary(2).unwrap();
    g.set_unary_cost(u0, 0, 0.0).unwrap();
    g.set_unary_cost(u0, 1, 0.0).unwrap();
    g.set_unary_cost(u1, 0, 0.0).unwrap();
    g.set_unary_cost(u1, 1, 0.0).unwrap();
    let p = g.add_pairwise(2, 2).unwrap();
    g.add_pairwise_link(u0, u1, p).unwrap();
    g.set_pairwise_cost(p, 0, 0, 0.0).unwrap();
    g.set_pairwise_cost(p, 0, 1, 2.0).unwrap();
    g.set_pairwise_cost(p, 1, 0, 2.0).unwrap();
    g.set_pairwise_cost(p, 1, 1, 0.0).unwrap();
    g.finalize().unwrap();

    let mut solver = GmSolver::new(g, SolverOptions::default());
    let mut hooks = SolverHooks::none();
    solver.run(2, &mut hooks).unwrap();

    assert!(solver.lower_bound().abs() < 1e-6);
    assert!(solver.evaluate_primal().abs() < 1e-6);
}

fn qap_two_by_two() -> QapGraph {
    let mut g = QapGraph::new();
    let unaries: Vec<_> = (0..2).map(|_| g.add_unary(2).unwrap()).collect();
    let unary_costs = [[0.0, 5.0], [5.0, 0.0]];
    for (u, row) in unaries.iter().zip(unary_costs) {
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
    g
}

#[test]
fn qap_two_by_two_assignment_converges_to_zero() {
    use crate::qap::QapSolver;

    let graph = qap_two_by_two();
    let mut solver = QapSolver::new(graph, SolverOptions::default());
    let mut hooks = SolverHooks::none();
    solver.run(10, &mut hooks).unwrap();

    assert!(solver.lower_bound().abs() < 1e-6);
}

#[test]
fn qap_primal_restore_round_trips_unary_primals() {
    use crate::qap::QapSolver;

    let graph = qap_two_by_two();
    let mut solver = QapSolver::new(graph, SolverOptions::default());
    let mut hooks = SolverHooks::none();
    solver.run(10, &mut hooks).unwrap();

    let mut storage = PrimalStorage::new();
    solver.save_primal(&mut storage);
    let before: Vec<_> = (0..solver.graph().num_unaries())
        .map(|i| solver.graph().unary_primal(i.into()))
        .collect();

    solver.reset_primal();
    solver.restore_primal(&storage);
    let after: Vec<_> = (0..solver.graph().num_unaries())
        .map(|i| solver.graph().unary_primal(i.into()))
        .collect();

    assert_eq!(before, after);
}

fn ct_two_detection_conflict() -> CtGraph {
    let mut g = CtGraph::new();
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
    g
}

#[test]
fn ct_two_detection_conflict_reaches_the_documented_bound() {
    use crate::ct::CtSolver;

    let graph = ct_two_detection_conflict();
    let mut solver = CtSolver::new(graph, SolverOptions::default());
    let mut hooks = SolverHooks::none();
    solver.run(1, &mut hooks).unwrap();

    assert!((solver.lower_bound() - (-3.0)).abs() < 1e-6);
}

#[test]
fn preparedness_failure_is_reported_as_not_prepared() {
    let mut g = GmGraph::new();
    let u0 = g.add_unary(2).unwrap();
    let u1 = g.add_unary(2).unwrap();
    g.set_unary_cost(u0, 0, 0.0).unwrap();
    g.set_unary_cost(u0, 1, 0.0).unwrap();
    g.set_unary_cost(u1, 0, 0.0).unwrap();
    g.set_unary_cost(u1, 1, 0.0).unwrap();
    let p = g.add_pairwise(2, 2).unwrap();
    g.add_pairwise_link(u0, u1, p).unwrap();
    g.set_pairwise_cost(p, 0, 0, 0.0).unwrap();
    g.set_pairwise_cost(p, 0, 1, 0.0).unwrap();
    g.set_pairwise_cost(p, 1, 0, 0.0).unwrap();
    // (1, 1) left unset.

    assert!(matches!(g.finalize(), Err(SolverError::NotPrepared { .. })));
}

#[rstest]
#[case::gm_chain(0)]
#[case::gm_single_pairwise(1)]
fn reset_primal_is_idempotent(#[case] variant: usize) {
    let mut g = if variant == 0 {
        gm_chain_of_three()
    } else {
        let mut g = GmGraph::new();
        let u0 = g.add_unary(2).unwrap();
        let u1 = g.add_unary(2).unwrap();
        for u in [u0, u1] {
            g.set_unary_cost(u, 0, 0.0).unwrap();
            g.set_unary_cost(u, 1, 0.0).unwrap();
        }
        let p = g.add_pairwise(2, 2).unwrap();
        g.add_pairwise_link(u0, u1, p).unwrap();
        for l0 in 0..2 {
            for l1 in 0..2 {
                g.set_pairwise_cost(p, l0, l1, 0.0).unwrap();
            }
        }
        g.finalize().unwrap();
        g
    };

    g.reset_primal();
    let once = g.evaluate_primal();
    g.reset_primal();
    let twice = g.evaluate_primal();
    assert_eq!(once, twice);
}

#[test]
fn consistency_merge_identity_and_absorption_hold_across_families() {
    assert_eq!(Consistency::Satisfied.merge(Consistency::Unknown), Consistency::Unknown);
    assert_eq!(
        Consistency::Unknown.merge(Consistency::Inconsistent),
        Consistency::Inconsistent
    );
    assert_eq!(
        Consistency::Inconsistent.merge(Consistency::Satisfied),
        Consistency::Inconsistent
    );
}
