//! C ABI binding layer. Opaque handles wrap a solver/graph pair; callers build the graph
//! through `graph_add_*`/`*_set_cost` calls against the handle returned by
//! `qap_solver_get_graph`, then finalize and run through the solver handle.
//!
//! Indices passed by the caller must be dense and monotonically increasing from 0 — each
//! `graph_add_*` call is rejected with [`QAP_ERR_BAD_INDEX`] unless `idx` equals the count
//! of nodes of that kind already added, mirroring how the arena-backed [`crate::qap::Graph`]
//! assigns ids in insertion order.
//!
//! GM and CT are documented extension points with the same shape (handle types below) but
//! are not wired to `extern "C"` functions here; the spec treats this binding layer as a
//! thin external adapter and only asks for one family to be carried end-to-end.

use std::os::raw::{c_double, c_int};

use crate::options::SolverOptions;
use crate::qap::{Graph as QapGraph, QapSolver};
use crate::solver::{SolverDriver, SolverHooks};

pub const QAP_OK: c_int = 0;
pub const QAP_ERR_NULL_HANDLE: c_int = -1;
pub const QAP_ERR_BAD_INDEX: c_int = -2;
pub const QAP_ERR_USAGE: c_int = -3;
pub const QAP_ERR_NOT_PREPARED: c_int = -4;
pub const QAP_ERR_FEATURE_DISABLED: c_int = -5;
pub const QAP_ERR_INVARIANT_VIOLATION: c_int = -6;

/// Opaque QAP solver handle, owning its graph.
pub struct QapSolverHandle(QapSolver);

/// Documented extension point; no `extern "C"` functions are wired to it yet.
pub struct GmSolverHandle(pub crate::gm::GmSolver);
/// Documented extension point; no `extern "C"` functions are wired to it yet.
pub struct CtSolverHandle(pub crate::ct::CtSolver);

fn code_of(err: crate::SolverError) -> c_int {
    use crate::SolverError::*;
    match err {
        StructuralError { .. } => QAP_ERR_BAD_INDEX,
        NotPrepared { .. } => QAP_ERR_NOT_PREPARED,
        FeatureDisabled { .. } => QAP_ERR_FEATURE_DISABLED,
        UsageError { .. } => QAP_ERR_USAGE,
        InvariantViolation { .. } => QAP_ERR_INVARIANT_VIOLATION,
    }
}

/// # Safety
/// `handle` must be a valid pointer produced by [`qap_solver_create`] and not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn qap_solver_create() -> *mut QapSolverHandle {
    let solver = QapSolver::new(QapGraph::new(), SolverOptions::default());
    Box::into_raw(Box::new(QapSolverHandle(solver)))
}

/// # Safety
/// `handle` must be a valid pointer produced by [`qap_solver_create`], or null.
#[no_mangle]
pub unsafe extern "C" fn qap_solver_destroy(handle: *mut QapSolverHandle) {
    if handle.is_null() {
        return;
    }
    drop(Box::from_raw(handle));
}

/// Returns a pointer into the solver's owned graph, valid as long as `handle` is.
///
/// # Safety
/// `handle` must be a valid, non-null pointer produced by [`qap_solver_create`].
#[no_mangle]
pub unsafe extern "C" fn qap_solver_get_graph(handle: *mut QapSolverHandle) -> *mut QapGraph {
    if handle.is_null() {
        return std::ptr::null_mut();
    }
    (*handle).0.graph_mut() as *mut QapGraph
}

/// # Safety
/// `handle` must be a valid, non-null pointer produced by [`qap_solver_create`].
#[no_mangle]
pub unsafe extern "C" fn qap_solver_finalize(handle: *mut QapSolverHandle) -> c_int {
    if handle.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    match (*handle).0.graph_mut().finalize() {
        Ok(()) => QAP_OK,
        Err(e) => code_of(e),
    }
}

/// # Safety
/// `handle` must be a valid, non-null pointer produced by [`qap_solver_create`], already
/// finalized via [`qap_solver_finalize`].
#[no_mangle]
pub unsafe extern "C" fn qap_solver_run(handle: *mut QapSolverHandle, max_iterations: u64) -> c_int {
    if handle.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    let mut hooks = SolverHooks::none();
    match (*handle).0.run(max_iterations, &mut hooks) {
        Ok(_) => QAP_OK,
        Err(e) => code_of(e),
    }
}

/// # Safety
/// `handle` must be a valid, non-null pointer produced by [`qap_solver_create`].
#[no_mangle]
pub unsafe extern "C" fn qap_solver_solve_ilp(handle: *mut QapSolverHandle) -> c_int {
    if handle.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    match (*handle).0.solve_ilp() {
        Ok(()) => QAP_OK,
        Err(e) => code_of(e),
    }
}

/// # Safety
/// `handle` must be a valid, non-null pointer produced by [`qap_solver_create`].
#[no_mangle]
pub unsafe extern "C" fn qap_solver_execute_combilp(handle: *mut QapSolverHandle) -> c_int {
    if handle.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    match (*handle).0.execute_combilp() {
        Ok(()) => QAP_OK,
        Err(e) => code_of(e),
    }
}

/// # Safety
/// `handle` must be a valid, non-null pointer produced by [`qap_solver_create`].
#[no_mangle]
pub unsafe extern "C" fn qap_solver_lower_bound(handle: *mut QapSolverHandle) -> c_double {
    if handle.is_null() {
        return c_double::NAN;
    }
    (*handle).0.lower_bound()
}

/// # Safety
/// `handle` must be a valid, non-null pointer produced by [`qap_solver_create`].
#[no_mangle]
pub unsafe extern "C" fn qap_solver_evaluate_primal(handle: *mut QapSolverHandle) -> c_double {
    if handle.is_null() {
        return c_double::NAN;
    }
    (*handle).0.evaluate_primal()
}

/// # Safety
/// `graph` must be a valid, non-null pointer obtained from [`qap_solver_get_graph`].
#[no_mangle]
pub unsafe extern "C" fn graph_add_unary(
    graph: *mut QapGraph,
    idx: usize,
    num_labels: usize,
    _num_forward_hint: usize,
    _num_backward_hint: usize,
) -> c_int {
    if graph.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    let graph = &mut *graph;
    if idx != graph.num_unaries() {
        return QAP_ERR_BAD_INDEX;
    }
    match graph.add_unary(num_labels) {
        Ok(_) => QAP_OK,
        Err(e) => code_of(e),
    }
}

/// # Safety
/// `graph` must be a valid, non-null pointer obtained from [`qap_solver_get_graph`].
#[no_mangle]
pub unsafe extern "C" fn graph_add_uniqueness(graph: *mut QapGraph, idx: usize, num_unary_edges: usize) -> c_int {
    if graph.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    let graph = &mut *graph;
    if idx != graph.num_uniquenesses() {
        return QAP_ERR_BAD_INDEX;
    }
    match graph.add_uniqueness(num_unary_edges) {
        Ok(_) => QAP_OK,
        Err(e) => code_of(e),
    }
}

/// # Safety
/// `graph` must be a valid, non-null pointer obtained from [`qap_solver_get_graph`].
#[no_mangle]
pub unsafe extern "C" fn graph_add_pairwise(
    graph: *mut QapGraph,
    idx: usize,
    num_labels0: usize,
    num_labels1: usize,
) -> c_int {
    if graph.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    let graph = &mut *graph;
    if idx != graph.num_pairwises() {
        return QAP_ERR_BAD_INDEX;
    }
    match graph.add_pairwise(num_labels0, num_labels1) {
        Ok(_) => QAP_OK,
        Err(e) => code_of(e),
    }
}

/// # Safety
/// `graph` must be a valid, non-null pointer obtained from [`qap_solver_get_graph`].
#[no_mangle]
pub unsafe extern "C" fn graph_add_pairwise_link(
    graph: *mut QapGraph,
    idx_u0: usize,
    idx_u1: usize,
    idx_p: usize,
) -> c_int {
    if graph.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    let graph = &mut *graph;
    match graph.add_pairwise_link(idx_u0.into(), idx_u1.into(), idx_p.into()) {
        Ok(()) => QAP_OK,
        Err(e) => code_of(e),
    }
}

/// # Safety
/// `graph` must be a valid, non-null pointer obtained from [`qap_solver_get_graph`].
#[no_mangle]
pub unsafe extern "C" fn graph_add_uniqueness_link(
    graph: *mut QapGraph,
    idx_unary: usize,
    label: usize,
    idx_uniqueness: usize,
) -> c_int {
    if graph.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    let graph = &mut *graph;
    match graph.add_uniqueness_link(idx_unary.into(), label, idx_uniqueness.into()) {
        Ok(_) => QAP_OK,
        Err(e) => code_of(e),
    }
}

/// # Safety
/// `graph` must be a valid, non-null pointer obtained from [`qap_solver_get_graph`].
#[no_mangle]
pub unsafe extern "C" fn unary_set_cost(graph: *mut QapGraph, idx: usize, label: usize, cost: c_double) -> c_int {
    if graph.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    match (&mut *graph).set_unary_cost(idx.into(), label, cost) {
        Ok(()) => QAP_OK,
        Err(e) => code_of(e),
    }
}

/// # Safety
/// `graph` must be a valid, non-null pointer obtained from [`qap_solver_get_graph`].
#[no_mangle]
pub unsafe extern "C" fn uniqueness_set_cost(graph: *mut QapGraph, idx: usize, slot: usize, cost: c_double) -> c_int {
    if graph.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    match (&mut *graph).set_uniqueness_cost(idx.into(), slot, cost) {
        Ok(()) => QAP_OK,
        Err(e) => code_of(e),
    }
}

/// # Safety
/// `graph` must be a valid, non-null pointer obtained from [`qap_solver_get_graph`].
#[no_mangle]
pub unsafe extern "C" fn pairwise_set_cost(
    graph: *mut QapGraph,
    idx: usize,
    label0: usize,
    label1: usize,
    cost: c_double,
) -> c_int {
    if graph.is_null() {
        return QAP_ERR_NULL_HANDLE;
    }
    match (&mut *graph).set_pairwise_cost(idx.into(), label0, label1, cost) {
        Ok(()) => QAP_OK,
        Err(e) => code_of(e),
    }
}
