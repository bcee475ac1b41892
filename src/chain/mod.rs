//! Ordered timeline of diffs anchored at an absolute baseline.
//!
//! Links live in a fixed-capacity arena and point at each other by slot
//! index. The root slot always holds an absolute state; every later link
//! holds a diff. Reconstruction walks the links in timestamp order, so it
//! costs O(k) in the number of diffs since the last rebase.

mod link;
mod state_chain;

pub use link::{ChainLink, Links, States};
pub use state_chain::{ChainStats, StateChain};
