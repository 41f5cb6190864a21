//! Lazy source-index tracking.
//!
//! A source index maps each locally held position of a dimension to its offset
//! in the untouched source data. Most dimensions never need more than the
//! contiguous range of their window, so the array is only built on first
//! access. The buffer is shared between copies of a dimension.

use std::sync::Arc;

use once_cell::unsync::OnceCell;

use crate::dimension::Bounds;

/// Deferred source index; empty until materialized or explicitly set.
#[derive(Clone, Debug, Default)]
pub struct SourceIndex {
    cell: OnceCell<Arc<[usize]>>,
}

impl SourceIndex {
    /// A tracker that will materialize on demand.
    pub fn lazy() -> Self {
        Self::default()
    }

    /// A tracker holding explicit offsets.
    pub fn explicit(values: impl Into<Arc<[usize]>>) -> Self {
        Self {
            cell: OnceCell::with_value(values.into()),
        }
    }

    /// Offsets if already set or materialized; never computes.
    pub fn peek(&self) -> Option<&[usize]> {
        self.cell.get().map(|v| &v[..])
    }

    pub fn is_materialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Offsets for `window`, computing the contiguous range on first access.
    /// A `None` window means nothing is tracked and nothing is cached.
    pub fn get_or_materialize(&self, window: Option<Bounds>) -> Option<&[usize]> {
        if let Some(v) = self.cell.get() {
            return Some(&v[..]);
        }
        let (lower, upper) = window?;
        Some(&self.cell.get_or_init(|| materialize((lower, upper)))[..])
    }

    pub(crate) fn shared(&self) -> Option<Arc<[usize]>> {
        self.cell.get().cloned()
    }
}

/// The contiguous offsets `lower..upper`.
pub fn materialize((lower, upper): Bounds) -> Arc<[usize]> {
    (lower..upper).collect()
}
