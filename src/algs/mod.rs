//! Re-export public algorithms.

pub mod communicator;
pub mod gather;
pub mod rank_bounds;
pub mod wire;

pub use gather::{dgather, hgather, vgather};
pub use rank_bounds::{RankBounds, get_rank_bounds};
