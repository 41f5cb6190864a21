//! Versioned byte payloads for collective operations.
//!
//! Communicators move opaque byte buffers; this module turns typed values into
//! those buffers and back. Every payload is prefixed with [`WIRE_VERSION`] so a
//! mismatched peer is reported instead of silently misread.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::dimension::{Bounds, Dimension};
use crate::dist_error::DistError;

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    version: u16,
    body: T,
}

/// Encode `value` into a versioned byte buffer.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, DistError> {
    Ok(bincode::serialize(&Envelope {
        version: WIRE_VERSION,
        body: value,
    })?)
}

/// Decode a buffer produced by [`encode`].
pub fn decode<T: DeserializeOwned>(buf: &[u8]) -> Result<T, DistError> {
    let env: Envelope<T> = bincode::deserialize(buf)?;
    if env.version != WIRE_VERSION {
        return Err(DistError::Wire(format!(
            "expected wire version {WIRE_VERSION}, got {}",
            env.version
        )));
    }
    Ok(env.body)
}

/// Per-rank state of a [`Dimension`] as it travels through a collective.
///
/// The source index is always materialized on the sending side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDimension {
    pub name: String,
    pub length: Option<usize>,
    pub length_current: Option<usize>,
    pub dist: bool,
    pub empty: bool,
    pub bounds_local: Option<Bounds>,
    pub bounds_global: Option<Bounds>,
    pub src_idx: Option<Vec<usize>>,
}

impl From<&Dimension> for WireDimension {
    fn from(dim: &Dimension) -> Self {
        Self {
            name: dim.name().to_string(),
            length: dim.length(),
            length_current: dim.length_current(),
            dist: dim.is_dist(),
            empty: dim.is_empty(),
            bounds_local: dim.bounds_local(),
            bounds_global: dim.stored_bounds_global(),
            src_idx: dim.src_idx().map(|s| s.to_vec()),
        }
    }
}

impl From<WireDimension> for Dimension {
    fn from(w: WireDimension) -> Self {
        Dimension::from_parts(
            w.name,
            w.length,
            w.length_current,
            w.dist,
            w.empty,
            w.bounds_local,
            w.bounds_global,
            w.src_idx,
        )
    }
}
