#![cfg_attr(docsrs, feature(doc_cfg))]
//! # ncdist
//!
//! ncdist is the distribution core for NetCDF-style multidimensional datasets in SPMD programs. It decides, for every rank of a communicator, which contiguous slice of each named dimension that rank owns, and keeps track of where every locally held element came from in the source data.
//!
//! ## Features
//! - Deterministic, communication-free splitting of a dimension into per-rank half-open windows
//! - Named dimensions with declared or unlimited length, Python-style slicing, and lazily materialized source indexes
//! - Per-rank registry of nested dimension groups with a one-shot bounds update and contagious emptiness
//! - Collective gather/scatter of dimensions over pluggable communication backends (serial, in-process threads, MPI)
//!
//! ## Determinism
//!
//! Bounds are a pure function of `(length, size, rank)`, so every rank computes
//! the same partition independently. The remainder of an uneven split goes to
//! the lowest ranks; ranks past the shortest distributed dimension own nothing.
//!
//! ## Usage
//! Add `ncdist` as a dependency in your `Cargo.toml` and enable features as needed:
//!
//! ```toml
//! [dependencies]
//! ncdist = "0.1"
//! # Optional features:
//! # features = ["mpi-support"]
//! ```
//!
//! ```
//! use ncdist::prelude::*;
//!
//! let mut ctx = DistributionContext::new(NoComm);
//! ctx.create_dimension(Dimension::builder("time").length(12).dist(true)).unwrap();
//! ctx.update_dimension_bounds(&GroupPath::root()).unwrap();
//! assert_eq!(ctx.get_bounds_local(&GroupPath::root()).unwrap(), vec![Some((0, 12))]);
//! ```

pub mod algs;
pub mod config;
pub mod context;
pub mod dimension;
pub mod dist_error;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{
        Communicator, CommunicatorExt, LocalComm, NoComm, spawn_world,
    };
    pub use crate::algs::rank_bounds::{RankBounds, get_rank_bounds};
    pub use crate::config::DistConfig;
    pub use crate::context::{DimensionGroup, DistributionContext, GroupPath};
    pub use crate::dimension::{Bounds, Dimension, DimensionBuilder, Index, Selection};
    pub use crate::dist_error::DistError;
}
