//! Dense-cost-table factor primitives shared by all three problem families.
//!
//! Every factor owns its cost table and a primal slot, never a reference to a neighbor;
//! the message kernels in [`crate::gm`], [`crate::qap`], and [`crate::ct`] are the only
//! code that mutates two factors in the same call, and they always do so through matched
//! `repam` pairs that preserve the joint objective.

mod conflict;
mod detection;
mod pairwise;
mod slotted;
mod unary;

pub use conflict::ConflictFactor;
pub use detection::{DetectionFactor, DetectionPrimal};
pub use pairwise::{PairwisePrimal, PairwiseFactor};
pub use slotted::SlottedFactor;
pub use unary::UnaryFactor;
