//! Tag paths for addressing nodes in a state tree.
//!
//! A path is the sequence of field tags leading from the tree root to a node.
//! Record fields are addressed by their schema tag, list elements by their
//! index. Paths are only used for addressing and diagnostics; snapshots never
//! carry them on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in a state tree.
///
/// Paths are immutable values: [`Path::nested`] returns a new path and leaves
/// the receiver untouched.
///
/// # Examples
///
/// ```
/// use sprig_state::Path;
///
/// let path = Path::root().nested(0).nested(2);
/// assert_eq!(path.len(), 2);
/// assert_eq!(path.to_string(), "$/0/2");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<u32>);

impl Path {
    /// Create the root path.
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a vector of tags.
    #[inline]
    pub fn from_tags(tags: Vec<u32>) -> Self {
        Self(tags)
    }

    /// Return a new path with `tag` appended.
    #[inline]
    pub fn nested(&self, tag: u32) -> Path {
        let mut tags = Vec::with_capacity(self.0.len() + 1);
        tags.extend_from_slice(&self.0);
        tags.push(tag);
        Path(tags)
    }

    /// Get the tags of this path.
    #[inline]
    pub fn tags(&self) -> &[u32] {
        &self.0
    }

    /// Check if this path is the root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of tags in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Alias for [`Path::is_root`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the last tag.
    #[inline]
    pub fn last(&self) -> Option<u32> {
        self.0.last().copied()
    }

    /// Get the parent path (path without the last tag).
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Path(rest.to_vec())),
            None => None,
        }
    }

    /// Split into the parent path and the last tag.
    #[inline]
    pub fn split_last(&self) -> Option<(Path, u32)> {
        self.0
            .split_last()
            .map(|(last, rest)| (Path(rest.to_vec()), *last))
    }

    /// Join this path with another path.
    #[inline]
    pub fn join(&self, other: &Path) -> Path {
        let mut tags = self.0.clone();
        tags.extend_from_slice(&other.0);
        Path(tags)
    }

    /// Check if this path is a prefix of another path.
    ///
    /// A path is a prefix of itself.
    ///
    /// ```
    /// use sprig_state::path;
    ///
    /// let parent = path![1];
    /// let child = path![1, 4];
    ///
    /// assert!(parent.is_prefix_of(&child));
    /// assert!(!child.is_prefix_of(&parent));
    /// assert!(parent.is_prefix_of(&parent));
    /// ```
    #[inline]
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Remove `prefix` from the front of this path.
    ///
    /// Returns `None` if `prefix` is not a prefix of this path.
    #[inline]
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        self.0.strip_prefix(prefix.0.as_slice()).map(|rest| Path(rest.to_vec()))
    }

    /// Iterate over the tags.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for tag in &self.0 {
            write!(f, "/{}", tag)?;
        }
        Ok(())
    }
}

impl From<Vec<u32>> for Path {
    fn from(tags: Vec<u32>) -> Self {
        Path(tags)
    }
}

impl From<&[u32]> for Path {
    fn from(tags: &[u32]) -> Self {
        Path(tags.to_vec())
    }
}

impl FromIterator<u32> for Path {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl IntoIterator for Path {
    type Item = u32;
    type IntoIter = std::vec::IntoIter<u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = u32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Construct a [`Path`] from a list of tags.
///
/// ```
/// use sprig_state::{path, Path};
///
/// assert_eq!(path![], Path::root());
/// assert_eq!(path![0, 3], Path::root().nested(0).nested(3));
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($tag:expr),+ $(,)?) => {
        $crate::Path::from_tags(vec![$($tag as u32),+])
    };
}
