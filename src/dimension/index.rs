//! Selectors accepted by [`Dimension::slice`](super::Dimension::slice).
//!
//! Every selector is normalized against the current length into a
//! [`Selection`] before it touches any data: either a contiguous unit-step
//! window or an explicit list of positions.

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::dist_error::DistError;

/// One axis selector. Negative values count from the end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Index {
    /// A single position; keeps the axis with length 1.
    Scalar(isize),
    /// `start:stop:step` with open ends.
    Range {
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    },
    /// Fancy indexing, any order, repeats allowed.
    List(Vec<isize>),
    /// Boolean mask; must match the current length.
    Mask(Vec<bool>),
}

impl Index {
    pub fn at(i: isize) -> Self {
        Index::Scalar(i)
    }

    pub fn slice(start: Option<isize>, stop: Option<isize>) -> Self {
        Index::Range {
            start,
            stop,
            step: None,
        }
    }

    pub fn slice_step(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Index::Range {
            start,
            stop,
            step: Some(step),
        }
    }

    pub fn full() -> Self {
        Index::slice(None, None)
    }

    /// Resolve against `len`. `strict` rejects out-of-range ranges instead of
    /// clamping them, for dimensions whose extent is not known.
    pub(crate) fn resolve(&self, len: usize, strict: bool) -> Result<Selection, Resolve> {
        match self {
            Index::Scalar(i) => {
                let p = resolve_position(*i, len).ok_or(Resolve::OutOfRange)?;
                Ok(Selection::Window(p..p + 1))
            }
            Index::Range { start, stop, step } => {
                let step = step.unwrap_or(1);
                if step == 0 {
                    return Err(Resolve::ZeroStep);
                }
                if strict {
                    check_strict(*start, len)?;
                    check_strict(*stop, len)?;
                }
                Ok(range_selection(*start, *stop, step, len))
            }
            Index::List(items) => items
                .iter()
                .map(|&i| resolve_position(i, len).ok_or(Resolve::OutOfRange))
                .collect::<Result<Vec<_>, _>>()
                .map(Selection::Positions),
            Index::Mask(mask) => {
                if mask.len() != len {
                    return Err(Resolve::MaskLength(mask.len()));
                }
                Ok(Selection::Positions(
                    mask.iter()
                        .enumerate()
                        .filter_map(|(i, &keep)| keep.then_some(i))
                        .collect(),
                ))
            }
        }
    }

    pub(crate) fn error(&self, err: Resolve, name: &str, len: usize) -> DistError {
        match err {
            Resolve::OutOfRange => DistError::IndexOutOfRange {
                name: name.to_string(),
                index: format!("{self:?}"),
                len,
            },
            Resolve::ZeroStep => DistError::ZeroStep {
                name: name.to_string(),
            },
            Resolve::MaskLength(mask_len) => DistError::MaskLength {
                name: name.to_string(),
                mask_len,
                len,
            },
        }
    }
}

/// Why a selector failed to resolve; turned into a [`DistError`] by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolve {
    OutOfRange,
    ZeroStep,
    MaskLength(usize),
}

/// Canonical form of an [`Index`] against a known length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Window(Range<usize>),
    Positions(Vec<usize>),
}

impl Selection {
    pub fn len(&self) -> usize {
        match self {
            Selection::Window(r) => r.len(),
            Selection::Positions(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply the selection to a slice of values.
    pub fn take<T: Copy>(&self, values: &[T]) -> Vec<T> {
        match self {
            Selection::Window(r) => values[r.clone()].to_vec(),
            Selection::Positions(p) => p.iter().map(|&i| values[i]).collect(),
        }
    }
}

fn resolve_position(i: isize, len: usize) -> Option<usize> {
    let p = if i < 0 {
        len.checked_sub(i.unsigned_abs())?
    } else {
        i as usize
    };
    (p < len).then_some(p)
}

fn check_strict(bound: Option<isize>, len: usize) -> Result<(), Resolve> {
    match bound {
        Some(b) if b >= 0 && b as usize > len => Err(Resolve::OutOfRange),
        Some(b) if b < 0 && b.unsigned_abs() > len => Err(Resolve::OutOfRange),
        _ => Ok(()),
    }
}

/// Python slice semantics: negative bounds wrap once, then clamp.
fn range_selection(start: Option<isize>, stop: Option<isize>, step: isize, len: usize) -> Selection {
    let n = len as isize;
    let (lower, upper) = if step > 0 { (0, n) } else { (-1, n - 1) };
    let clamp = |b: isize| {
        if b < 0 {
            (b + n).max(lower)
        } else {
            b.min(upper)
        }
    };
    let start = start.map_or(if step > 0 { lower } else { upper }, clamp);
    let stop = stop.map_or(if step > 0 { upper } else { lower }, clamp);

    if step == 1 {
        let (a, b) = (start as usize, stop.max(start) as usize);
        return Selection::Window(a..b);
    }
    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(i as usize);
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Selection::Positions(out)
}

impl From<isize> for Index {
    fn from(i: isize) -> Self {
        Index::Scalar(i)
    }
}

impl From<Range<isize>> for Index {
    fn from(r: Range<isize>) -> Self {
        Index::slice(Some(r.start), Some(r.end))
    }
}

impl From<RangeFrom<isize>> for Index {
    fn from(r: RangeFrom<isize>) -> Self {
        Index::slice(Some(r.start), None)
    }
}

impl From<RangeTo<isize>> for Index {
    fn from(r: RangeTo<isize>) -> Self {
        Index::slice(None, Some(r.end))
    }
}

impl From<RangeFull> for Index {
    fn from(_: RangeFull) -> Self {
        Index::full()
    }
}

impl From<Vec<isize>> for Index {
    fn from(v: Vec<isize>) -> Self {
        Index::List(v)
    }
}

impl From<Vec<bool>> for Index {
    fn from(v: Vec<bool>) -> Self {
        Index::Mask(v)
    }
}
