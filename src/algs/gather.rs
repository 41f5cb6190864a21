//! Merge per-rank array parts collected by a gather, in rank order.
//!
//! These are the array-side companions of [`crate::dimension::Dimension::gather`]:
//! a data layer gathers its buffers with [`CommunicatorExt::gather`] and
//! stitches them together here. Empty parts (ranks with no share) are skipped.
//!
//! [`CommunicatorExt::gather`]: crate::algs::communicator::CommunicatorExt::gather

use std::collections::BTreeMap;

use crate::dist_error::DistError;

/// Concatenate 1-d parts along their only axis.
pub fn hgather<T: Clone>(parts: &[Vec<T>]) -> Vec<T> {
    let n = parts.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(n);
    for p in parts.iter().filter(|p| !p.is_empty()) {
        out.extend_from_slice(p);
    }
    out
}

/// Stack row-major 2-d parts with `ncols` columns along the row axis.
pub fn vgather<T: Clone>(parts: &[Vec<T>], ncols: usize) -> Result<Vec<T>, DistError> {
    for (rank, p) in parts.iter().enumerate() {
        if (ncols == 0 && !p.is_empty()) || (ncols != 0 && p.len() % ncols != 0) {
            return Err(DistError::GatherMismatch {
                name: format!("rank {rank}"),
                detail: format!("{} values do not form rows of {ncols}", p.len()),
            });
        }
    }
    Ok(hgather(parts))
}

/// Merge keyed parts; later ranks overwrite earlier ones on key collisions.
pub fn dgather<K: Ord, V>(parts: Vec<BTreeMap<K, V>>) -> BTreeMap<K, V> {
    let mut out = BTreeMap::new();
    for p in parts {
        out.extend(p);
    }
    out
}
