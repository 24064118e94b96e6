//! Strong id types for the vertex connectivity layer.
//!
//! A [`GlobalVertexId`] names one physical mesh vertex process-wide. The set
//! of ids in use does not have to be contiguous or zero-based: a mesh with
//! four vertices may number them `{3, 10, 11, 40}`. A [`TreeVertexPair`]
//! addresses one corner of one local or ghost tree; its derived ordering is
//! the canonical tie-break used when vertex buckets are committed.

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Process-wide identifier of a physical mesh vertex.
///
/// # Memory layout
/// `repr(transparent)` over `u64`, so slices of ids can be cast to byte
/// buffers for exchange without copying.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Pod,
    Zeroable,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(transparent)]
pub struct GlobalVertexId(u64);

impl GlobalVertexId {
    /// Creates a new `GlobalVertexId` from a raw `u64` value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        GlobalVertexId(raw)
    }

    /// Returns the inner `u64` value of this id.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for GlobalVertexId {
    fn from(raw: u64) -> Self {
        GlobalVertexId(raw)
    }
}

impl fmt::Debug for GlobalVertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobalVertexId").field(&self.get()).finish()
    }
}

impl fmt::Display for GlobalVertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// One (tree, corner) reference to a global vertex.
///
/// `tree` indexes local trees first, then ghost trees; `corner` is the local
/// corner index within the tree's element class. The derived `Ord` compares
/// by tree, then corner — the canonical order of committed vertex buckets.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct TreeVertexPair {
    pub tree: usize,
    pub corner: usize,
}

impl TreeVertexPair {
    #[inline]
    pub const fn new(tree: usize, corner: usize) -> Self {
        TreeVertexPair { tree, corner }
    }
}

impl fmt::Display for TreeVertexPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.tree, self.corner)
    }
}

#[cfg(test)]
mod layout_tests {
    //! Compile-time assertion that `GlobalVertexId` has the same size as `u64`.
    use super::*;
    use static_assertions::assert_eq_size;

    // If this fails, our repr(transparent) guarantee is broken!
    assert_eq_size!(GlobalVertexId, u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_and_get() {
        let v = GlobalVertexId::new(42);
        assert_eq!(v.get(), 42);
    }

    #[test]
    fn debug_and_display() {
        let v = GlobalVertexId::new(7);
        assert_eq!(format!("{:?}", v), "GlobalVertexId(7)");
        assert_eq!(format!("{}", v), "7");
    }

    #[test]
    fn pair_ordering_is_tree_then_corner() {
        // Example: (1, 3), (0, 0), (1, 0) becomes (0, 0), (1, 0), (1, 3).
        let mut pairs = vec![
            TreeVertexPair::new(1, 3),
            TreeVertexPair::new(0, 0),
            TreeVertexPair::new(1, 0),
        ];
        pairs.sort_unstable();
        assert_eq!(
            pairs,
            vec![
                TreeVertexPair::new(0, 0),
                TreeVertexPair::new(1, 0),
                TreeVertexPair::new(1, 3),
            ]
        );
    }

    #[test]
    fn id_ordering_and_hash() {
        use std::collections::HashSet;
        let a = GlobalVertexId::new(1);
        let b = GlobalVertexId::new(2);
        assert!(a < b);
        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 2);
    }
}
