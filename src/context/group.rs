//! Group paths and the ordered dimension collections they name.

use std::fmt;

use crate::dimension::Dimension;

/// Path to a (possibly nested) dimension group; the root group is the empty path.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupPath(Vec<String>);

impl GroupPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Path of a child group.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut parts = self.0.clone();
        parts.push(name.into());
        Self(parts)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for p in &self.0 {
            write!(f, "/{p}")?;
        }
        Ok(())
    }
}

/// Dimensions of one group, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DimensionGroup {
    dims: Vec<Dimension>,
}

impl DimensionGroup {
    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Dimension> {
        self.dims.iter().find(|d| d.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Dimension> {
        self.dims.iter_mut().find(|d| d.name() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dimension> {
        self.dims.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Dimension> {
        self.dims.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dims.iter().map(Dimension::name)
    }

    /// Insert, replacing an existing dimension of the same name in place.
    pub(crate) fn upsert(&mut self, dim: Dimension) {
        match self.position(dim.name()) {
            Some(i) => self.dims[i] = dim,
            None => self.dims.push(dim),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.dims.iter().position(|d| d.name() == name)
    }
}

impl<'a> IntoIterator for &'a DimensionGroup {
    type Item = &'a Dimension;
    type IntoIter = std::slice::Iter<'a, Dimension>;

    fn into_iter(self) -> Self::IntoIter {
        self.dims.iter()
    }
}

impl FromIterator<Dimension> for DimensionGroup {
    fn from_iter<T: IntoIterator<Item = Dimension>>(iter: T) -> Self {
        let mut group = DimensionGroup::default();
        for d in iter {
            group.upsert(d);
        }
        group
    }
}
