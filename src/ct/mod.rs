//! Conflict-constrained detection (CT) problem family: detections that can switch on/off,
//! grouped into conflict factors enforcing that at most one linked detection is on.

mod graph;
mod messages;
mod solver;

pub use graph::{ConflictId, DetectionId, Graph};
pub use solver::CtSolver;
