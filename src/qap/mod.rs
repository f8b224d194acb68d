//! Quadratic assignment problem (QAP) family: GM-style pairwise unaries plus uniqueness
//! (one-to-one matching) constraints over unary labels.

mod graph;
mod messages;
mod primal_storage;
mod solver;

pub use graph::{Graph, PairwiseId, UnaryId, UniquenessId};
pub use primal_storage::PrimalStorage;
pub use solver::QapSolver;
