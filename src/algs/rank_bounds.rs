//! Split a global axis of `length` elements across `size` ranks.
//!
//! Bounds are half-open `(lower, upper)` pairs into the global index space.
//! Splits are maximally even: two ranks' shares differ by at most one element
//! and the remainder goes to the lowest ranks. A rank with nothing to own gets
//! `None`, never a zero-width pair.

use std::ops::Range;

use itertools::Itertools;

use crate::dimension::Bounds;

/// Bounds owned by `rank` when `length` elements are split across `size` ranks.
///
/// Returns `None` for a zero length, for `rank >= size`, and for ranks past
/// the end when there are more ranks than elements.
///
/// ```
/// use ncdist::algs::rank_bounds::get_rank_bounds;
/// assert_eq!(get_rank_bounds(5, 4, 2), Some((3, 4)));
/// assert_eq!(get_rank_bounds(5, 8, 6), None);
/// ```
pub fn get_rank_bounds(length: usize, size: usize, rank: usize) -> Option<Bounds> {
    if length == 0 {
        return None;
    }
    // Possible with an overridden size smaller than the physical communicator.
    if rank >= size {
        return None;
    }
    if length > size {
        let (esplit, remainder) = (length / size, length % size);
        if remainder == 0 {
            return bounds_with_split(length, esplit, rank);
        }
        let (lower, upper) = bounds_with_split(length - remainder, esplit, rank)?;
        if rank < remainder {
            Some((lower + rank, upper + rank + 1))
        } else {
            Some((lower + remainder, upper + remainder))
        }
    } else {
        // length <= size: ceil(length / size) is 1.
        let esplit = length.div_ceil(size);
        bounds_with_split(length, esplit, rank)
    }
}

fn bounds_with_split(length: usize, esplit: usize, rank: usize) -> Option<Bounds> {
    let lower = rank * esplit;
    let upper = (lower + esplit).min(length);
    (lower < upper).then_some((lower, upper))
}

/// Calculator object for one rank's view of a split axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankBounds {
    pub nelements: usize,
    pub size: usize,
    pub rank: usize,
}

impl RankBounds {
    pub fn new(nelements: usize, size: usize, rank: usize) -> Self {
        Self {
            nelements,
            size,
            rank,
        }
    }

    pub fn bounds_global(&self) -> Bounds {
        (0, self.nelements)
    }

    pub fn bounds_local(&self) -> Option<Bounds> {
        get_rank_bounds(self.nelements, self.size, self.rank)
    }

    pub fn size_global(&self) -> usize {
        self.nelements
    }

    pub fn size_local(&self) -> Option<usize> {
        self.bounds_local().map(|(l, u)| u - l)
    }
}

/// Map a global half-open selection onto a rank's local frame.
///
/// Returns `None` when the selection and the local bounds do not overlap.
pub fn get_global_to_local_slice(start_stop: Bounds, bounds_local: Bounds) -> Option<Bounds> {
    let (start, stop) = start_stop;
    let (lower, upper) = bounds_local;
    if start >= upper || stop <= lower {
        return None;
    }
    let new_start = start.max(lower);
    let new_stop = stop.min(upper);
    (new_start < new_stop).then(|| (new_start - lower, new_stop - lower))
}

/// Contiguous chunks of `0..length`, one per rank, in the manner of
/// `array_split`: empty ranges are kept when `size > length`.
pub fn create_slices(length: usize, size: usize) -> Vec<Range<usize>> {
    if size == 0 {
        return Vec::new();
    }
    let (base, rem) = (length / size, length % size);
    let mut start = 0;
    (0..size)
        .map(|i| {
            let stop = start + base + usize::from(i < rem);
            let r = start..stop;
            start = stop;
            r
        })
        .collect()
}

/// Every combination of per-axis chunks for an n-d block decomposition.
///
/// `splits[i]` is the number of chunks along axis `i` of `shape`.
pub fn create_nd_slices(splits: &[usize], shape: &[usize]) -> Vec<Vec<Range<usize>>> {
    splits
        .iter()
        .zip(shape)
        .map(|(&split, &len)| create_slices(len, split))
        .multi_cartesian_product()
        .collect()
}

/// Choose how many chunks each axis of `shape` gets for `size` ranks.
///
/// The first axis takes all ranks when it is long enough; otherwise every axis
/// gets roughly the n-th root of `size`, capped by its own length.
pub fn get_optimal_splits(size: usize, shape: &[usize]) -> Vec<usize> {
    let n_elements: usize = shape.iter().product();
    if shape.is_empty() || size >= n_elements {
        return shape.to_vec();
    }
    if size <= shape[0] {
        let mut splits = vec![1; shape.len()];
        splits[0] = size;
        return splits;
    }
    // Nudge so exact roots such as 8^(1/3) are not truncated to 1.
    let even = ((size as f64).powf(1.0 / shape.len() as f64) + 1e-9).floor() as usize;
    shape.iter().map(|&len| even.min(len)).collect()
}
