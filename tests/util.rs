#![allow(dead_code)]
use ncdist::prelude::*;

/// Root group path.
pub fn root() -> GroupPath {
    GroupPath::root()
}

/// Bounded dimension whose source index is the identity.
pub fn sourced(name: &str, n: usize) -> Dimension {
    Dimension::builder(name)
        .length(n)
        .src_idx((0..n).collect())
        .build()
        .unwrap()
}

/// Reference Python slice `values[start:stop]` with unit step.
pub fn py_slice(values: &[usize], start: isize, stop: isize) -> Vec<usize> {
    let n = values.len() as isize;
    let clamp = |i: isize| if i < 0 { (i + n).max(0) } else { i.min(n) };
    let (lo, hi) = (clamp(start), clamp(stop));
    if lo >= hi {
        return Vec::new();
    }
    values[lo as usize..hi as usize].to_vec()
}

/// Source index of `dim`, empty when nothing is held.
pub fn src_of(dim: &Dimension) -> Vec<usize> {
    dim.src_idx().map(<[usize]>::to_vec).unwrap_or_default()
}

/// Build a context on `comm`, register `dims` in the root group and update
/// bounds.
pub fn updated<C: Communicator>(comm: C, dims: Vec<DimensionBuilder>) -> DistributionContext<C> {
    let mut ctx = DistributionContext::new(comm);
    for d in dims {
        ctx.create_dimension(d).unwrap();
    }
    ctx.update_dimension_bounds(&root()).unwrap();
    ctx
}
