//! DistError: unified error type for ncdist public APIs
//!
//! Every fallible operation in the crate returns this type. Variants carry the
//! offending dimension name and values so a failure can be diagnosed without
//! re-running the job.

use thiserror::Error;

/// Unified error type for dimension and distribution operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DistError {
    /// A distributed dimension was declared without any length information.
    #[error("distributed dimension `{name}` requires a length or length_current")]
    MissingLength { name: String },

    /// `update_dimension_bounds` was called a second time on one context.
    #[error("dimension bounds already updated for this context")]
    BoundsAlreadyUpdated,

    /// An index or slice fell outside the extent of the dimension.
    #[error("index {index} out of range for dimension `{name}` with length {len}")]
    IndexOutOfRange {
        name: String,
        index: String,
        len: usize,
    },

    /// A range selector used a zero step.
    #[error("slice step cannot be zero (dimension `{name}`)")]
    ZeroStep { name: String },

    /// A boolean mask did not match the dimension length.
    #[error("boolean mask of length {mask_len} does not match dimension `{name}` with length {len}")]
    MaskLength {
        name: String,
        mask_len: usize,
        len: usize,
    },

    /// A source index did not match the length it must describe.
    #[error("source index for dimension `{name}` has length {got}, expected {expected}")]
    SourceIndexLength {
        name: String,
        expected: usize,
        got: usize,
    },

    /// A dimension name is already registered in a group.
    #[error("dimension `{name}` already in group `{group}`")]
    DuplicateDimension { name: String, group: String },

    /// Lookup of an unknown dimension.
    #[error("dimension `{name}` not found in group `{group}`")]
    DimensionNotFound { name: String, group: String },

    /// Lookup of an unknown group.
    #[error("group `{group}` not found")]
    GroupNotFound { group: String },

    /// A collective was addressed to a rank outside the communicator.
    #[error("root rank {root} is outside communicator of size {size}")]
    InvalidRoot { root: usize, size: usize },

    /// A split size override outside `1..=size` of the communicator.
    #[error("size override {size_override} must be between 1 and the communicator size {size}")]
    InvalidSizeOverride { size_override: usize, size: usize },

    /// A scatter source still holds only one rank's share.
    #[error("dimension `{name}` is already distributed on the root; gather it before scattering")]
    AlreadyDistributed { name: String },

    /// A non-empty distributed part reached a gather without local bounds.
    #[error("dimension `{name}` has no local bounds on rank {rank}; cannot gather")]
    MissingBounds { name: String, rank: usize },

    /// Per-rank parts do not tile a contiguous global window.
    #[error("gather of dimension `{name}` failed: {detail}")]
    GatherMismatch { name: String, detail: String },

    /// Transport failure reported by a communicator backend.
    #[error("communication error: {0}")]
    Comm(String),

    /// A collective payload could not be encoded or decoded.
    #[error("wire codec error: {0}")]
    Wire(String),
}

impl From<bincode::Error> for DistError {
    fn from(err: bincode::Error) -> Self {
        DistError::Wire(err.to_string())
    }
}
