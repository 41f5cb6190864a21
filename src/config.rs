//! Distribution settings for a [`DistributionContext`](crate::context::DistributionContext).

/// Plain settings with sensible defaults; construct with struct update syntax:
///
/// ```
/// use ncdist::config::DistConfig;
/// let cfg = DistConfig { size_override: Some(2), ..Default::default() };
/// assert_eq!(cfg.size_override, Some(2));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistConfig {
    /// Split across this many ranks instead of the communicator size. Ranks at
    /// or past the override own nothing. Must lie in `1..=comm.size()`; a
    /// larger value would hand shares to ranks that do not exist.
    pub size_override: Option<usize>,
}
