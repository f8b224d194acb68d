//! Thin external-collaborator seams named by the interface surface but implemented outside
//! this crate: an ILP fallback via a commercial MIP solver, a CombiLP decomposition driver,
//! and a C ABI binding layer for embedding the QAP solver from non-Rust callers.
//!
//! The MIP and CombiLP adapters ship as traits with no concrete implementation; a solver
//! with neither registered reports `FeatureDisabled` from [`crate::solver::SolverDriver`]'s
//! default `solve_ilp`/`execute_combilp` bodies. The C ABI module, unlike those two, is
//! fully specified and is implemented end-to-end for the QAP family.

pub mod combilp;
pub mod ffi;
pub mod mip;

pub use combilp::CombiLpAdapter;
pub use mip::{FactorVisitor, MipAdapter};
