//! Pairwise graphical model (GM) problem family: unary and pairwise factors connected by a
//! fixed forward/backward orientation, solved by a TRW-S-style message-passing sweep.

mod graph;
mod messages;
mod solver;

pub use graph::{Graph, PairwiseId, UnaryId};
pub use solver::GmSolver;
