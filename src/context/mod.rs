//! Per-rank registry of dimension groups and the coordination around them.
//!
//! A [`DistributionContext`] owns a communicator and a tree of named dimension
//! groups. It computes every group's local bounds once, without
//! communication, from the global lengths, this rank, and the split size. It
//! also runs the collective gather/scatter of whole groups.
//!
//! Each rank builds its own context; nothing here is shared across ranks.

pub mod group;

use std::collections::BTreeMap;

use crate::algs::communicator::{Communicator, CommunicatorExt, check_root};
use crate::algs::rank_bounds::get_rank_bounds;
use crate::algs::wire::WireDimension;
use crate::config::DistConfig;
use crate::dimension::{Bounds, Dimension, DimensionBuilder};
use crate::dist_error::DistError;

pub use group::{DimensionGroup, GroupPath};

/// Communicator, configuration, and the dimension groups of one rank.
pub struct DistributionContext<C: Communicator> {
    comm: C,
    config: DistConfig,
    groups: BTreeMap<GroupPath, DimensionGroup>,
    has_updated_dimensions: bool,
}

impl<C: Communicator> DistributionContext<C> {
    pub fn new(comm: C) -> Self {
        Self {
            comm,
            config: DistConfig::default(),
            groups: BTreeMap::new(),
            has_updated_dimensions: false,
        }
    }

    /// Context with explicit settings; rejects a `size_override` outside
    /// `1..=comm.size()`.
    pub fn with_config(comm: C, config: DistConfig) -> Result<Self, DistError> {
        if let Some(size_override) = config.size_override {
            let size = comm.size();
            if size_override == 0 || size_override > size {
                return Err(DistError::InvalidSizeOverride {
                    size_override,
                    size,
                });
            }
        }
        Ok(Self {
            config,
            ..Self::new(comm)
        })
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn config(&self) -> &DistConfig {
        &self.config
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    /// Number of ranks bounds are split across.
    pub fn size(&self) -> usize {
        self.config.size_override.unwrap_or_else(|| self.comm.size())
    }

    pub fn has_updated_dimensions(&self) -> bool {
        self.has_updated_dimensions
    }

    /// Register `dim` in `group`, creating the group if needed.
    ///
    /// A name already present is an error unless `force` replaces it.
    pub fn add_dimension(
        &mut self,
        dim: Dimension,
        group: &GroupPath,
        force: bool,
    ) -> Result<(), DistError> {
        let the_group = self.groups.entry(group.clone()).or_default();
        if !force && the_group.contains(dim.name()) {
            return Err(DistError::DuplicateDimension {
                name: dim.name().to_string(),
                group: group.to_string(),
            });
        }
        the_group.upsert(dim);
        Ok(())
    }

    /// Build a dimension and register it in the root group.
    pub fn create_dimension(&mut self, builder: DimensionBuilder) -> Result<&Dimension, DistError> {
        self.create_dimension_in(builder, &GroupPath::root(), false)
    }

    /// Build a dimension and register it in `group`.
    pub fn create_dimension_in(
        &mut self,
        builder: DimensionBuilder,
        group: &GroupPath,
        force: bool,
    ) -> Result<&Dimension, DistError> {
        let name = builder.name().to_string();
        self.add_dimension(builder.build()?, group, force)?;
        self.get_dimension(&name, group)
    }

    pub fn get_group(&self, group: &GroupPath) -> Result<&DimensionGroup, DistError> {
        self.groups.get(group).ok_or_else(|| DistError::GroupNotFound {
            group: group.to_string(),
        })
    }

    fn get_group_mut(&mut self, group: &GroupPath) -> Result<&mut DimensionGroup, DistError> {
        self.groups.get_mut(group).ok_or_else(|| DistError::GroupNotFound {
            group: group.to_string(),
        })
    }

    pub fn get_dimension(&self, name: &str, group: &GroupPath) -> Result<&Dimension, DistError> {
        self.get_group(group)?
            .get(name)
            .ok_or_else(|| DistError::DimensionNotFound {
                name: name.to_string(),
                group: group.to_string(),
            })
    }

    pub fn get_dimension_mut(
        &mut self,
        name: &str,
        group: &GroupPath,
    ) -> Result<&mut Dimension, DistError> {
        self.get_group_mut(group)?
            .get_mut(name)
            .ok_or_else(|| DistError::DimensionNotFound {
                name: name.to_string(),
                group: group.to_string(),
            })
    }

    pub fn iter_dimensions(
        &self,
        group: &GroupPath,
    ) -> Result<impl Iterator<Item = &Dimension>, DistError> {
        Ok(self.get_group(group)?.iter())
    }

    pub fn groups(&self) -> impl Iterator<Item = (&GroupPath, &DimensionGroup)> {
        self.groups.iter()
    }

    /// Local bounds of every dimension in `group`, in insertion order.
    pub fn get_bounds_local(&self, group: &GroupPath) -> Result<Vec<Option<Bounds>>, DistError> {
        Ok(self.iter_dimensions(group)?.map(Dimension::bounds_local).collect())
    }

    /// Compute this rank's bounds for every dimension of `group`. One-shot.
    ///
    /// Distributed dimensions are split across
    /// `min(size, shortest distributed length)` ranks, so every participating
    /// rank owns at least one element of each; the remaining ranks come out
    /// empty. Undistributed dimensions own their whole extent. If any
    /// dimension is empty on this rank, every dimension of the group is.
    pub fn update_dimension_bounds(&mut self, group: &GroupPath) -> Result<(), DistError> {
        if self.has_updated_dimensions {
            return Err(DistError::BoundsAlreadyUpdated);
        }
        let (size, rank) = (self.size(), self.rank());
        let dims = self.get_group_mut(group)?;
        let the_size = split_size(size, dims.iter().filter(|d| d.is_dist()));
        log::debug!("updating bounds of group `{group}` on rank {rank}: split size {the_size}");

        for dim in dims.iter_mut() {
            if !dim.is_dist() {
                dim.apply_whole_bounds();
                continue;
            }
            // Already split by an explicit scatter.
            if dim.bounds_local().is_some() || dim.is_empty() {
                continue;
            }
            let bounds = get_rank_bounds(dim.len(), the_size, rank);
            log::trace!("`{}` on rank {rank}: {bounds:?}", dim.name());
            dim.apply_bounds(bounds)?;
        }
        propagate_emptiness(dims, group, rank);

        self.has_updated_dimensions = true;
        Ok(())
    }

    /// Collective: gather every distributed dimension of `group` onto `root`.
    ///
    /// Undistributed dimensions pass through with their local bounds cleared.
    /// Returns the merged group on `root` and `None` elsewhere. All ranks walk
    /// the group to the end even after a failure so none is left waiting in a
    /// collective; the first error is reported afterwards.
    pub fn gather_dimensions(
        &mut self,
        group: &GroupPath,
        root: usize,
    ) -> Result<Option<&DimensionGroup>, DistError> {
        check_root(root, self.comm.size())?;
        let is_root = self.comm.rank() == root;
        let comm = &self.comm;
        let the_group = self
            .groups
            .get_mut(group)
            .ok_or_else(|| DistError::GroupNotFound {
                group: group.to_string(),
            })?;

        let mut merged = Vec::with_capacity(the_group.len());
        let mut maybe_err = None;
        for dim in the_group.iter_mut() {
            if dim.is_dist() {
                match dim.gather(comm, root) {
                    Ok(Some(d)) => merged.push(d),
                    Ok(None) => {}
                    Err(e) => {
                        maybe_err.get_or_insert(e);
                    }
                }
            } else {
                dim.clear_bounds_local();
                if is_root {
                    // Contagion from a distributed neighbor does not survive the merge.
                    let mut whole = dim.clone();
                    whole.clear_empty();
                    merged.push(whole);
                }
            }
        }
        if let Some(err) = maybe_err {
            return Err(err);
        }
        if !is_root {
            return Ok(None);
        }
        for d in merged {
            the_group.upsert(d);
        }
        Ok(Some(&*the_group))
    }

    /// Collective: replace `group` on every rank with the root's copy and
    /// distribute the dimensions listed in `names`.
    ///
    /// The split follows the same rule as [`update_dimension_bounds`], so
    /// scattering a freshly gathered group reproduces the earlier per-rank
    /// bounds and source indexes. The root's copies of `names` must be
    /// undistributed; a root still holding only its own share fails with
    /// [`DistError::AlreadyDistributed`] on every rank.
    ///
    /// [`update_dimension_bounds`]: Self::update_dimension_bounds
    pub fn scatter_dimensions(
        &mut self,
        group: &GroupPath,
        names: &[&str],
        root: usize,
    ) -> Result<(), DistError> {
        check_root(root, self.comm.size())?;
        let rank = self.comm.rank();
        let payload: Option<Vec<WireDimension>> = self
            .groups
            .get(group)
            .map(|g| g.iter().map(WireDimension::from).collect());
        let received: Option<Vec<WireDimension>> = self
            .comm
            .broadcast((rank == root).then_some(&payload), root)?;
        let Some(received) = received else {
            return Err(DistError::GroupNotFound {
                group: group.to_string(),
            });
        };

        let mut dims: DimensionGroup = received.into_iter().map(Dimension::from).collect();
        if let Some(missing) = names.iter().find(|n| !dims.contains(n)) {
            return Err(DistError::DimensionNotFound {
                name: missing.to_string(),
                group: group.to_string(),
            });
        }
        // Every rank sees the same payload, so every rank fails alike.
        if let Some(split) = dims.iter().find(|d| {
            names.contains(&d.name()) && d.is_dist() && (d.bounds_local().is_some() || d.is_empty())
        }) {
            return Err(DistError::AlreadyDistributed {
                name: split.name().to_string(),
            });
        }
        let the_size = split_size(self.size(), dims.iter().filter(|d| names.contains(&d.name())));
        log::debug!("scattering {names:?} of group `{group}` on rank {rank}: split size {the_size}");

        for dim in dims.iter_mut() {
            if names.contains(&dim.name()) {
                dim.mark_dist();
                let bounds = get_rank_bounds(dim.len(), the_size, rank);
                dim.apply_bounds(bounds)?;
            } else {
                dim.apply_whole_bounds();
            }
        }
        propagate_emptiness(&mut dims, group, rank);
        self.groups.insert(group.clone(), dims);
        Ok(())
    }
}

/// Ranks to split across: never more than the shortest distributed axis has
/// elements.
fn split_size<'a>(size: usize, distributed: impl Iterator<Item = &'a Dimension>) -> usize {
    distributed
        .map(Dimension::length_global)
        .min()
        .map_or(size, |shortest| shortest.min(size))
}

fn propagate_emptiness(dims: &mut DimensionGroup, group: &GroupPath, rank: usize) {
    if dims.iter().any(Dimension::is_empty) {
        log::debug!("group `{group}` is empty on rank {rank}");
        for dim in dims.iter_mut() {
            dim.mark_empty();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;

    fn root() -> GroupPath {
        GroupPath::root()
    }

    #[test]
    fn duplicate_names_need_force() {
        let mut ctx = DistributionContext::new(NoComm);
        ctx.create_dimension(Dimension::builder("lat").length(4)).unwrap();
        let err = ctx
            .create_dimension(Dimension::builder("lat").length(5))
            .unwrap_err();
        assert!(matches!(err, DistError::DuplicateDimension { .. }));
        let d = ctx
            .create_dimension_in(Dimension::builder("lat").length(5), &root(), true)
            .unwrap();
        assert_eq!(d.len(), 5);
    }

    #[test]
    fn construction_errors_surface() {
        let mut ctx = DistributionContext::new(NoComm);
        let err = ctx
            .create_dimension(Dimension::builder("ua").dist(true))
            .unwrap_err();
        assert_eq!(err, DistError::MissingLength { name: "ua".into() });
        assert!(matches!(
            ctx.get_group(&root()),
            Err(DistError::GroupNotFound { .. })
        ));
    }

    #[test]
    fn update_is_one_shot() {
        let mut ctx = DistributionContext::new(NoComm);
        ctx.create_dimension(Dimension::builder("x").length(3).dist(true))
            .unwrap();
        ctx.update_dimension_bounds(&root()).unwrap();
        assert!(ctx.has_updated_dimensions());
        assert_eq!(
            ctx.update_dimension_bounds(&root()),
            Err(DistError::BoundsAlreadyUpdated)
        );
    }

    #[test]
    fn serial_bounds() {
        let mut ctx = DistributionContext::new(NoComm);
        ctx.create_dimension(Dimension::builder("time").length_current(4).dist(true))
            .unwrap();
        ctx.create_dimension(Dimension::builder("lat").length(3)).unwrap();
        ctx.update_dimension_bounds(&root()).unwrap();
        assert_eq!(
            ctx.get_bounds_local(&root()).unwrap(),
            vec![Some((0, 4)), Some((0, 3))]
        );
        let time = ctx.get_dimension("time", &root()).unwrap();
        assert_eq!(time.bounds_global(), (0, 4));
        assert_eq!(time.src_idx(), Some(&[0, 1, 2, 3][..]));
    }

    #[test]
    fn zero_length_distributed_empties_the_group() {
        let mut ctx = DistributionContext::new(NoComm);
        ctx.create_dimension(Dimension::builder("zero").length(0).dist(true))
            .unwrap();
        ctx.create_dimension(Dimension::builder("lon").length(2)).unwrap();
        ctx.update_dimension_bounds(&root()).unwrap();
        let zero = ctx.get_dimension("zero", &root()).unwrap();
        assert_eq!(zero.len(), 0);
        assert_eq!(zero.src_idx(), None);
        assert!(ctx.iter_dimensions(&root()).unwrap().all(Dimension::is_empty));
    }

    #[test]
    fn size_override_must_fit_the_communicator() {
        for bad in [0, 2] {
            let cfg = DistConfig {
                size_override: Some(bad),
            };
            assert!(matches!(
                DistributionContext::with_config(NoComm, cfg),
                Err(DistError::InvalidSizeOverride { size: 1, .. })
            ));
        }
        let cfg = DistConfig {
            size_override: Some(1),
        };
        let ctx = DistributionContext::with_config(NoComm, cfg).unwrap();
        assert_eq!(ctx.size(), 1);
    }

    #[test]
    fn scatter_refuses_a_split_root() {
        let mut ctx = DistributionContext::new(NoComm);
        ctx.create_dimension(Dimension::builder("x").length(4).dist(true))
            .unwrap();
        ctx.update_dimension_bounds(&root()).unwrap();
        assert_eq!(
            ctx.scatter_dimensions(&root(), &["x"], 0),
            Err(DistError::AlreadyDistributed { name: "x".into() })
        );
    }

    #[test]
    fn nested_groups_are_independent() {
        let mut ctx = DistributionContext::new(NoComm);
        let g = GroupPath::new(["model"]).child("ocean");
        ctx.create_dimension_in(Dimension::builder("depth").length(7), &g, false)
            .unwrap();
        ctx.create_dimension(Dimension::builder("depth").length(2)).unwrap();
        assert_eq!(ctx.get_dimension("depth", &g).unwrap().len(), 7);
        assert_eq!(ctx.get_dimension("depth", &root()).unwrap().len(), 2);
        assert_eq!(ctx.groups().count(), 2);
        assert!(matches!(
            ctx.get_dimension("lat", &g),
            Err(DistError::DimensionNotFound { .. })
        ));
    }

    #[test]
    fn serial_gather_then_scatter() {
        let mut ctx = DistributionContext::new(NoComm);
        ctx.create_dimension(
            Dimension::builder("x")
                .length(5)
                .dist(true)
                .src_idx(vec![9, 7, 5, 3, 1]),
        )
        .unwrap();
        ctx.create_dimension(Dimension::builder("y").length(2)).unwrap();
        ctx.update_dimension_bounds(&root()).unwrap();

        let merged = ctx.gather_dimensions(&root(), 0).unwrap().unwrap();
        let x = merged.get("x").unwrap();
        assert!(!x.is_dist());
        assert_eq!(x.bounds_local(), None);
        assert_eq!(x.src_idx(), Some(&[9, 7, 5, 3, 1][..]));
        assert_eq!(merged.get("y").unwrap().bounds_local(), None);

        ctx.scatter_dimensions(&root(), &["x"], 0).unwrap();
        let x = ctx.get_dimension("x", &root()).unwrap();
        assert!(x.is_dist());
        assert_eq!(x.bounds_local(), Some((0, 5)));
        assert_eq!(x.src_idx(), Some(&[9, 7, 5, 3, 1][..]));
    }

    #[test]
    fn scatter_unknown_name_fails() {
        let mut ctx = DistributionContext::new(NoComm);
        ctx.create_dimension(Dimension::builder("y").length(2)).unwrap();
        assert!(matches!(
            ctx.scatter_dimensions(&root(), &["nope"], 0),
            Err(DistError::DimensionNotFound { .. })
        ));
        assert!(matches!(
            ctx.gather_dimensions(&root(), 3),
            Err(DistError::InvalidRoot { root: 3, size: 1 })
        ));
    }
}
