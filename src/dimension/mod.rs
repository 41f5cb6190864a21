//! Named logical axes that may be split across ranks.
//!
//! A [`Dimension`] records a declared global length (or none, when the axis is
//! unlimited), the length currently realized on this rank, whether it is
//! distributed, the local and global index windows once bounds are computed,
//! and a lazily built source index that survives arbitrary re-slicing.
//!
//! Lifecycle of the distribution status:
//!
//! ```text
//! UNDISTRIBUTED --scatter--> DISTRIBUTED --update bounds--> DISTRIBUTED+bounds (maybe EMPTY)
//!       ^                                                          |
//!       +-------------------------- gather ------------------------+
//! ```

pub mod index;
pub mod src_idx;

use std::fmt;

use crate::algs::communicator::{Communicator, CommunicatorExt, check_root};
use crate::algs::rank_bounds::get_rank_bounds;
use crate::algs::wire::WireDimension;
use crate::dist_error::DistError;

pub use index::{Index, Selection};
pub use src_idx::SourceIndex;

/// Half-open `(lower, upper)` window into a global index space.
pub type Bounds = (usize, usize);

/// A named logical axis of a multidimensional variable.
#[derive(Clone, Debug)]
pub struct Dimension {
    name: String,
    length: Option<usize>,
    length_current: Option<usize>,
    dist: bool,
    empty: bool,
    bounds_local: Option<Bounds>,
    bounds_global: Option<Bounds>,
    src_idx: SourceIndex,
}

/// Validating constructor for [`Dimension`].
#[derive(Clone, Debug, Default)]
pub struct DimensionBuilder {
    name: String,
    length: Option<usize>,
    length_current: Option<usize>,
    dist: bool,
    src_idx: Option<Vec<usize>>,
}

impl DimensionBuilder {
    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn length_current(mut self, length_current: usize) -> Self {
        self.length_current = Some(length_current);
        self
    }

    pub fn dist(mut self, dist: bool) -> Self {
        self.dist = dist;
        self
    }

    /// Explicit source offsets; `length_current` defaults to their count.
    pub fn src_idx(mut self, src_idx: Vec<usize>) -> Self {
        self.src_idx = Some(src_idx);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(self) -> Result<Dimension, DistError> {
        let length_current = self
            .length_current
            .or(self.src_idx.as_ref().map(Vec::len));
        if self.dist && self.length.is_none() && length_current.is_none() {
            return Err(DistError::MissingLength { name: self.name });
        }
        let mut dim = Dimension {
            name: self.name,
            length: self.length,
            length_current,
            dist: self.dist,
            empty: false,
            bounds_local: None,
            bounds_global: None,
            src_idx: SourceIndex::lazy(),
        };
        if let Some(src) = self.src_idx {
            let expected = dim.len();
            if src.len() != expected {
                return Err(DistError::SourceIndexLength {
                    name: dim.name,
                    expected,
                    got: src.len(),
                });
            }
            dim.src_idx = SourceIndex::explicit(src);
        }
        Ok(dim)
    }
}

impl Dimension {
    /// Non-distributed dimension; `None` declares it unlimited.
    pub fn new(name: impl Into<String>, length: Option<usize>) -> Self {
        Self {
            name: name.into(),
            length,
            length_current: None,
            dist: false,
            empty: false,
            bounds_local: None,
            bounds_global: None,
            src_idx: SourceIndex::lazy(),
        }
    }

    pub fn builder(name: impl Into<String>) -> DimensionBuilder {
        DimensionBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        name: String,
        length: Option<usize>,
        length_current: Option<usize>,
        dist: bool,
        empty: bool,
        bounds_local: Option<Bounds>,
        bounds_global: Option<Bounds>,
        src_idx: Option<Vec<usize>>,
    ) -> Self {
        Self {
            name,
            length,
            length_current,
            dist,
            empty,
            bounds_local,
            bounds_global,
            src_idx: src_idx.map_or_else(SourceIndex::lazy, SourceIndex::explicit),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared global length; `None` for unlimited dimensions.
    pub fn length(&self) -> Option<usize> {
        self.length
    }

    pub fn length_current(&self) -> Option<usize> {
        self.length_current
    }

    pub fn is_unlimited(&self) -> bool {
        self.length.is_none()
    }

    pub fn is_dist(&self) -> bool {
        self.dist
    }

    /// True when this rank holds nothing along this axis.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Number of positions held on this rank.
    ///
    /// For a distributed dimension the realized `length_current` (the local
    /// share once bounds are set) takes precedence over the declared length.
    pub fn len(&self) -> usize {
        if self.empty {
            0
        } else if self.dist {
            self.length_current.or(self.length).unwrap_or(0)
        } else {
            self.length.or(self.length_current).unwrap_or(0)
        }
    }

    pub fn bounds_local(&self) -> Option<Bounds> {
        self.bounds_local
    }

    /// `(0, total)` over all ranks; falls back to this rank's extent before
    /// bounds are computed.
    pub fn bounds_global(&self) -> Bounds {
        self.bounds_global.unwrap_or((0, self.len()))
    }

    pub(crate) fn stored_bounds_global(&self) -> Option<Bounds> {
        self.bounds_global
    }

    pub fn length_global(&self) -> usize {
        let (lower, upper) = self.bounds_global();
        upper - lower
    }

    /// Cheap copy; the source-index buffer is shared until either side slices.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Offsets of the locally held positions in the source data.
    ///
    /// Materializes `lower..upper` of the local window on first access.
    /// `None` for empty and zero-length dimensions.
    pub fn src_idx(&self) -> Option<&[usize]> {
        if self.empty || self.len() == 0 {
            return None;
        }
        let window = match (self.dist, self.bounds_local) {
            (true, Some(bounds)) => bounds,
            _ => (0, self.len()),
        };
        self.src_idx.get_or_materialize(Some(window))
    }

    /// Replace the source index.
    ///
    /// A distributed dimension with local bounds accepts either its local
    /// share or the full global array, which is restricted to the local
    /// window. `None` drops explicit offsets back to the lazy default.
    pub fn set_src_idx(&mut self, value: Option<Vec<usize>>) -> Result<(), DistError> {
        let Some(value) = value else {
            self.src_idx = SourceIndex::lazy();
            return Ok(());
        };
        if self.empty {
            self.src_idx = SourceIndex::lazy();
            return Ok(());
        }
        if !self.dist && self.is_unlimited() && self.length_current.is_none() {
            self.length_current = Some(value.len());
        }
        let len = self.len();
        if value.len() == len {
            self.src_idx = SourceIndex::explicit(value);
            return Ok(());
        }
        match self.bounds_local {
            Some((lower, upper)) if self.dist && value.len() == self.length_global() => {
                self.src_idx = SourceIndex::explicit(&value[lower..upper]);
                Ok(())
            }
            _ => Err(DistError::SourceIndexLength {
                name: self.name.clone(),
                expected: len,
                got: value.len(),
            }),
        }
    }

    /// Select positions along this axis, returning a new dimension.
    ///
    /// Ranges clamp like Python slices on dimensions of declared length; on
    /// unlimited dimensions an out-of-range bound is an error. The source
    /// index is re-indexed with the same selection. An empty dimension
    /// returns an empty copy of itself.
    pub fn slice(&self, index: impl Into<Index>) -> Result<Dimension, DistError> {
        if self.empty {
            return Ok(self.clone());
        }
        let index = index.into();
        let len = self.len();
        let sel = index
            .resolve(len, self.is_unlimited())
            .map_err(|e| index.error(e, &self.name, len))?;
        let n = sel.len();

        let mut ret = self.clone();
        if self.dist || self.length.is_none() {
            ret.length_current = Some(n);
        } else {
            ret.length = Some(n);
            if ret.length_current.is_some() {
                ret.length_current = Some(n);
            }
        }
        ret.src_idx = match self.src_idx() {
            Some(src) if n > 0 => SourceIndex::explicit(sel.take(src)),
            _ => SourceIndex::lazy(),
        };
        ret.bounds_local = match (self.bounds_local, &sel) {
            _ if n == 0 => None,
            (Some((lower, _)), Selection::Window(r)) if self.dist => {
                Some((lower + r.start, lower + r.end))
            }
            (Some(_), _) if !self.dist => Some((0, n)),
            _ => None,
        };
        Ok(ret)
    }

    /// Install this rank's window of a fresh split of the current extent.
    pub(crate) fn apply_bounds(&mut self, bounds: Option<Bounds>) -> Result<(), DistError> {
        let global = self.len();
        let explicit = self.src_idx.shared();
        self.bounds_global = Some((0, global));
        self.bounds_local = bounds;
        match bounds {
            None => {
                self.empty = true;
                self.src_idx = SourceIndex::lazy();
            }
            Some((lower, upper)) => {
                self.length_current = Some(upper - lower);
                if let Some(src) = explicit {
                    let part = src.get(lower..upper).ok_or_else(|| DistError::SourceIndexLength {
                        name: self.name.clone(),
                        expected: global,
                        got: src.len(),
                    })?;
                    self.src_idx = SourceIndex::explicit(part);
                }
            }
        }
        Ok(())
    }

    /// Undistributed dimensions own their whole extent.
    pub(crate) fn apply_whole_bounds(&mut self) {
        let len = self.len();
        if len > 0 {
            self.bounds_local = Some((0, len));
        }
    }

    pub(crate) fn mark_dist(&mut self) {
        self.dist = true;
    }

    pub(crate) fn mark_empty(&mut self) {
        self.empty = true;
    }

    pub(crate) fn clear_bounds_local(&mut self) {
        self.bounds_local = None;
    }

    pub(crate) fn clear_empty(&mut self) {
        self.empty = false;
    }

    /// Mark distributed and keep only this rank's share of a fresh split.
    ///
    /// Local: no communication, every rank computes its own window from the
    /// communicator's rank and size. A dimension that already carries local
    /// bounds is left unchanged.
    pub fn scatter<C: Communicator>(&mut self, comm: &C) -> Result<(), DistError> {
        if self.dist && (self.bounds_local.is_some() || self.empty) {
            return Ok(());
        }
        self.dist = true;
        let bounds = get_rank_bounds(self.len(), comm.size(), comm.rank());
        log::trace!(
            "scatter `{}` on rank {}: {:?}",
            self.name,
            comm.rank(),
            bounds
        );
        self.apply_bounds(bounds)
    }

    /// Collective: merge every rank's share into one undistributed dimension
    /// on `root`. Other ranks get `Ok(None)`.
    ///
    /// Every rank of `comm` must call this. Validation of the parts happens
    /// on the root after the exchange, so a bad part never strands the other
    /// ranks inside the collective.
    pub fn gather<C: Communicator>(
        &self,
        comm: &C,
        root: usize,
    ) -> Result<Option<Dimension>, DistError> {
        check_root(root, comm.size())?;
        if !self.dist {
            return Ok((comm.rank() == root).then(|| {
                let mut d = self.clone();
                d.bounds_local = None;
                d.bounds_global = None;
                d
            }));
        }
        // A single serial rank is its own gather; skip the wire round trip.
        if comm.is_no_comm() {
            return self.merge_parts(vec![self.clone()]).map(Some);
        }
        let part = WireDimension::from(self);
        let Some(parts) = comm.gather(&part, root)? else {
            return Ok(None);
        };
        log::debug!("gathered {} parts of `{}` on rank {root}", parts.len(), self.name);
        self.merge_parts(parts.into_iter().map(Dimension::from).collect())
            .map(Some)
    }

    fn merge_parts(&self, parts: Vec<Dimension>) -> Result<Dimension, DistError> {
        let mut windows = Vec::with_capacity(parts.len());
        for (rank, part) in parts.iter().enumerate() {
            if part.is_empty() || part.len() == 0 {
                continue;
            }
            let (lower, upper) = part.bounds_local.ok_or_else(|| DistError::MissingBounds {
                name: self.name.clone(),
                rank,
            })?;
            if upper - lower != part.len() {
                return Err(DistError::GatherMismatch {
                    name: self.name.clone(),
                    detail: format!(
                        "rank {rank} holds {} positions in window ({lower}, {upper})",
                        part.len()
                    ),
                });
            }
            windows.push((lower, upper, part));
        }
        windows.sort_by_key(|&(lower, ..)| lower);

        let base = windows.first().map_or(0, |&(lower, ..)| lower);
        let mut cursor = base;
        for &(lower, upper, _) in &windows {
            if lower != cursor {
                return Err(DistError::GatherMismatch {
                    name: self.name.clone(),
                    detail: format!("expected a part starting at {cursor}, found ({lower}, {upper})"),
                });
            }
            cursor = upper;
        }
        let total = cursor - base;

        let mut src = vec![0usize; total];
        for (lower, upper, part) in &windows {
            let values = part.src_idx().ok_or_else(|| DistError::GatherMismatch {
                name: self.name.clone(),
                detail: format!("part ({lower}, {upper}) carries no source index"),
            })?;
            src[lower - base..upper - base].copy_from_slice(values);
        }

        Ok(Dimension {
            name: self.name.clone(),
            length: self.length.map(|_| total),
            length_current: Some(total),
            dist: false,
            empty: false,
            bounds_local: None,
            bounds_global: None,
            src_idx: if total > 0 {
                SourceIndex::explicit(src)
            } else {
                SourceIndex::lazy()
            },
        })
    }
}

/// Field-wise equality; lazy source indexes are materialized to compare by value.
impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.length == other.length
            && self.length_current == other.length_current
            && self.dist == other.dist
            && self.empty == other.empty
            && self.bounds_local == other.bounds_local
            && self.bounds_global == other.bounds_global
            && self.src_idx() == other.src_idx()
    }
}

impl Eq for Dimension {}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length {
            Some(n) => write!(f, "Dimension(name='{}', length={n})", self.name),
            None => write!(f, "Dimension(name='{}', length=None)", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;

    fn sourced(n: usize) -> Dimension {
        Dimension::builder("foo")
            .length(n)
            .src_idx((0..n).collect())
            .build()
            .unwrap()
    }

    #[test]
    fn len_prefers_declared_length() {
        assert_eq!(Dimension::new("foo", None).len(), 0);
        assert_eq!(Dimension::new("foo", Some(23)).len(), 23);
        let d = Dimension::builder("unlimited").length_current(4).build().unwrap();
        assert!(d.is_unlimited());
        assert_eq!(d.len(), 4);
    }

    #[test]
    fn distributed_needs_a_length() {
        let err = Dimension::builder("ua").dist(true).build().unwrap_err();
        assert_eq!(err, DistError::MissingLength { name: "ua".into() });
        assert!(Dimension::builder("ua").dist(true).length_current(3).build().is_ok());
    }

    #[test]
    fn src_idx_sets_length_current() {
        let d = Dimension::builder("u")
            .dist(true)
            .src_idx(vec![3, 4, 5, 6])
            .build()
            .unwrap();
        assert_eq!(d.length_current(), Some(4));
        assert_eq!(d.src_idx(), Some(&[3, 4, 5, 6][..]));
    }

    #[test]
    fn src_idx_length_is_checked() {
        let err = Dimension::builder("x")
            .length(3)
            .src_idx(vec![1, 2])
            .build()
            .unwrap_err();
        assert!(matches!(err, DistError::SourceIndexLength { expected: 3, got: 2, .. }));
    }

    #[test]
    fn zero_length_has_no_src_idx() {
        let d = Dimension::builder("zero").length(0).dist(true).build().unwrap();
        assert_eq!(d.len(), 0);
        assert_eq!(d.src_idx(), None);
    }

    #[test]
    fn slice_negative_bounds() {
        let d = Dimension::new("geom", Some(2));
        assert_eq!(d.slice(0isize..-1).unwrap(), Dimension::new("geom", Some(1)));

        let d = sourced(5);
        let want = Dimension::builder("foo").length(2).src_idx(vec![1, 2]).build().unwrap();
        assert_eq!(d.slice(1isize..-2).unwrap(), want);

        let d = sourced(10);
        assert_eq!(d.slice(-3isize..).unwrap().src_idx(), Some(&[7, 8, 9][..]));
        assert_eq!(d.slice(3isize..-1).unwrap().src_idx(), Some(&[3, 4, 5, 6, 7, 8][..]));
        for idx in [Index::from(-7isize..-3), Index::from(..-3isize)] {
            let sub = d.slice(idx).unwrap();
            assert_eq!(sub.src_idx().unwrap().len(), sub.len());
        }
    }

    #[test]
    fn slice_scalar_list_mask() {
        let d = sourced(10);
        assert_eq!(d.slice(4isize).unwrap().len(), 1);
        assert_eq!(d.slice(4isize..6).unwrap().len(), 2);
        let sub = d.slice(vec![2isize, 4, 6]).unwrap();
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.src_idx(), Some(&[2, 4, 6][..]));
        let mask: Vec<bool> = (0..10).map(|i| i % 3 == 0).collect();
        let sub = d.slice(mask).unwrap();
        assert_eq!(sub.len(), 4);
        assert_eq!(sub.src_idx(), Some(&[0, 3, 6, 9][..]));
        assert_eq!(d.slice(..).unwrap().len(), 10);
    }

    #[test]
    fn slice_plain_window() {
        let d = Dimension::new("foo", Some(50));
        assert_eq!(d.slice(30isize..40).unwrap().len(), 10);
        assert_eq!(Dimension::new("foo", Some(10)).slice(2isize..).unwrap().len(), 8);
    }

    #[test]
    fn unlimited_out_of_range_is_an_error() {
        let d = Dimension::new("foo", None);
        let err = d.slice(400isize..500).unwrap_err();
        assert!(matches!(err, DistError::IndexOutOfRange { ref name, len: 0, .. } if name == "foo"));
    }

    #[test]
    fn bad_selectors_name_the_dimension() {
        let d = sourced(3);
        assert!(matches!(d.slice(7isize), Err(DistError::IndexOutOfRange { len: 3, .. })));
        assert!(matches!(
            d.slice(vec![true]),
            Err(DistError::MaskLength { mask_len: 1, len: 3, .. })
        ));
        assert!(matches!(
            d.slice(Index::slice_step(None, None, 0)),
            Err(DistError::ZeroStep { .. })
        ));
    }

    #[test]
    fn slicing_a_copy_leaves_the_parent() {
        let d = sourced(10);
        let c = d.copy();
        assert_eq!(c, d);
        let sub = c.slice(2isize..5).unwrap();
        assert_ne!(sub, c);
        assert_eq!(d.len(), 10);
        assert_eq!(c.len(), 10);
        assert_eq!(d.src_idx().unwrap().len(), 10);
    }

    #[test]
    fn lazy_and_explicit_compare_by_value() {
        let lazy = Dimension::builder("foo").length(4).length_current(4).build().unwrap();
        let explicit = Dimension::builder("foo").length(4).src_idx(vec![0, 1, 2, 3]).build().unwrap();
        assert_eq!(lazy, explicit);
        let other = Dimension::builder("foo").length(4).src_idx(vec![3, 2, 1, 0]).build().unwrap();
        assert_ne!(lazy, other);
    }

    #[test]
    fn set_src_idx_restricts_to_local_window() {
        let mut d = Dimension::builder("x").length(6).dist(true).build().unwrap();
        d.apply_bounds(Some((2, 4))).unwrap();
        d.set_src_idx(Some(vec![10, 11, 12, 13, 14, 15])).unwrap();
        assert_eq!(d.src_idx(), Some(&[12, 13][..]));
        d.set_src_idx(Some(vec![7, 8])).unwrap();
        assert_eq!(d.src_idx(), Some(&[7, 8][..]));
        assert!(d.set_src_idx(Some(vec![1, 2, 3])).is_err());
        d.set_src_idx(None).unwrap();
        assert_eq!(d.src_idx(), Some(&[2, 3][..]));
    }

    #[test]
    fn empty_dimension_slices_to_itself() {
        let mut d = Dimension::builder("x").length(3).dist(true).build().unwrap();
        d.apply_bounds(None).unwrap();
        assert!(d.is_empty());
        assert_eq!(d.len(), 0);
        assert_eq!(d.src_idx(), None);
        assert_eq!(d.slice(0isize..2).unwrap(), d);
    }

    #[test]
    fn distributed_window_slice_shifts_bounds() {
        let mut d = Dimension::builder("x").length(10).dist(true).build().unwrap();
        d.apply_bounds(Some((5, 10))).unwrap();
        let sub = d.slice(1isize..3).unwrap();
        assert_eq!(sub.bounds_local(), Some((6, 8)));
        assert_eq!(sub.src_idx(), Some(&[6, 7][..]));
        assert_eq!(sub.len(), 2);
        let picked = d.slice(vec![0isize, 4]).unwrap();
        assert_eq!(picked.bounds_local(), None);
        assert_eq!(picked.src_idx(), Some(&[5, 9][..]));
    }

    #[test]
    fn single_rank_scatter_gather() {
        let mut d = Dimension::builder("scatter").length(6).build().unwrap();
        assert_eq!(d.src_idx().unwrap().len(), 6);
        d.scatter(&NoComm).unwrap();
        assert!(d.is_dist());
        assert_eq!(d.bounds_local(), Some((0, 6)));
        let g = d.gather(&NoComm, 0).unwrap().unwrap();
        assert!(!g.is_dist());
        assert_eq!(g.bounds_local(), None);
        assert_eq!(g.len(), 6);
        assert_eq!(g.src_idx(), Some(&[0, 1, 2, 3, 4, 5][..]));
    }

    #[test]
    fn display_names_the_dimension() {
        assert_eq!(Dimension::new("lat", Some(3)).to_string(), "Dimension(name='lat', length=3)");
        assert_eq!(Dimension::new("t", None).to_string(), "Dimension(name='t', length=None)");
    }
}
