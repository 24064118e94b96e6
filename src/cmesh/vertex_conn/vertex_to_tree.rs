//! Vertex-to-tree map: per global vertex id, the sorted list of (tree,
//! corner) pairs referencing it.
//!
//! This is the inverse index of [`super::TreeToVertex`]. Construction is an
//! O(total corners) append-only pass over all local and ghost trees; no
//! sorting happens during insertion. Commit sorts every bucket into the
//! canonical (tree, corner) order, then validates completeness: every corner
//! of every tree must appear in exactly one bucket.

use std::collections::BTreeMap;

use super::{ConnState, TreeToVertex};
use crate::cmesh::TreeLayout;
use crate::cmesh::ids::{GlobalVertexId, TreeVertexPair};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::ForestMeshError;

/// Inverse vertex index of a cmesh.
///
/// Two instances are equal iff their states are equal and the stored maps
/// are equal — same key set, same list contents in the same order. A tree
/// may legitimately appear multiple times in one vertex's list when several
/// of its corners coincide at that vertex (degenerate elements); such
/// entries are never deduplicated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexToTree {
    vertex_to_tree: BTreeMap<GlobalVertexId, Vec<TreeVertexPair>>,
    state: ConnState,
}

impl VertexToTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn is_committed(&self) -> bool {
        self.state == ConnState::Committed
    }

    /// Build and commit the inverse index of a committed tree-to-vertex map.
    ///
    /// Iterates every local *and* ghost tree of `layout` — neighbor-owned
    /// trees still reference shared vertices needed for topology.
    ///
    /// # Panics
    /// Panics if `ttv` is not committed, or if the commit-time completeness
    /// check fails.
    pub fn from_tree_to_vertex(layout: &TreeLayout, ttv: &TreeToVertex) -> Self {
        if !ttv.is_committed() {
            panic!("vertex-to-tree map: building from an uncommitted tree-to-vertex map");
        }
        let mut vtt = Self::new();
        for tree in 0..layout.num_trees_and_ghosts() {
            let num_corners = layout.class_of(tree).num_vertices();
            let ids = ttv.get_global_vertices(tree, num_corners);
            for (corner, &id) in ids.iter().enumerate() {
                vtt.add_vertex_to_tree(layout, id, tree, corner);
            }
        }
        vtt.commit(layout);
        vtt
    }

    /// Append one (tree, corner) reference to the bucket of a global vertex.
    ///
    /// # Panics
    /// Panics if the map is committed or if `tree`/`corner` are out of range
    /// for `layout`.
    pub fn add_vertex_to_tree(
        &mut self,
        layout: &TreeLayout,
        vertex: GlobalVertexId,
        tree: usize,
        corner: usize,
    ) {
        if self.is_committed() {
            panic!("vertex-to-tree map: trying to add vertex {vertex} after commit");
        }
        if !layout.is_valid_tree(tree) {
            panic!(
                "vertex-to-tree map: tree index {tree} out of range ({} trees and ghosts)",
                layout.num_trees_and_ghosts()
            );
        }
        let num_corners = layout.class_of(tree).num_vertices();
        if corner >= num_corners {
            panic!(
                "vertex-to-tree map: corner {corner} out of range for tree {tree} ({num_corners} corners)"
            );
        }
        self.vertex_to_tree
            .entry(vertex)
            .or_default()
            .push(TreeVertexPair::new(tree, corner));
    }

    /// Mark the map committed: sort every bucket into canonical (tree,
    /// corner) order, then validate completeness against `layout`.
    ///
    /// # Panics
    /// Panics if already committed, or if any tree corner of `layout` is
    /// referenced zero or multiple times across the buckets.
    pub fn commit(&mut self, layout: &TreeLayout) {
        if self.is_committed() {
            panic!("vertex-to-tree map: commit called twice");
        }
        self.sort_lists_by_tree_id();
        self.state = ConnState::Committed;
        self.assert_contains_all_vertices(layout);
        log::debug!(
            "committed vertex-to-tree map: {} global vertices",
            self.vertex_to_tree.len()
        );
    }

    /// Sort each vertex bucket by (tree, corner).
    /// Example: (1, 3), (0, 0), (1, 0) becomes (0, 0), (1, 0), (1, 3).
    fn sort_lists_by_tree_id(&mut self) {
        for list in self.vertex_to_tree.values_mut() {
            debug_assert!(!list.is_empty());
            list.sort_unstable();
        }
    }

    /// The sorted (tree, corner) list of a global vertex.
    ///
    /// # Panics
    /// Panics if the map is not committed, or if `vertex` does not exist in
    /// this mesh partition — a missing vertex indicates a topology
    /// construction bug, not a user-input problem, so the miss is fatal.
    pub fn get_tree_list_of_vertex(&self, vertex: GlobalVertexId) -> &[TreeVertexPair] {
        if !self.is_committed() {
            panic!("vertex-to-tree map: get_tree_list_of_vertex before commit");
        }
        match self.vertex_to_tree.get(&vertex) {
            Some(list) => list,
            None => panic!("vertex-to-tree map: global vertex {vertex} does not exist in this mesh"),
        }
    }

    /// Number of distinct global vertex ids stored.
    pub fn num_global_vertices(&self) -> usize {
        self.vertex_to_tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_to_tree.is_empty()
    }

    /// Iterate over (vertex, bucket) entries in ascending vertex order.
    pub fn iter(&self) -> impl Iterator<Item = (GlobalVertexId, &[TreeVertexPair])> {
        self.vertex_to_tree
            .iter()
            .map(|(&vertex, list)| (vertex, list.as_slice()))
    }

    /// Completeness sweep: every local/ghost tree corner appears in exactly
    /// one bucket. Each tree starts with its corner count and every stored
    /// pair decrements it; all counters must reach exactly zero.
    fn assert_contains_all_vertices(&self, layout: &TreeLayout) {
        let num_trees = layout.num_trees_and_ghosts();
        let mut remaining: Vec<isize> = (0..num_trees)
            .map(|tree| layout.class_of(tree).num_vertices() as isize)
            .collect();

        for (vertex, list) in self.iter() {
            for pair in list {
                if pair.tree >= num_trees {
                    panic!(
                        "vertex-to-tree map: invalid tree id {} stored at vertex {vertex}",
                        pair.tree
                    );
                }
                let num_corners = layout.class_of(pair.tree).num_vertices();
                if pair.corner >= num_corners {
                    panic!(
                        "vertex-to-tree map: invalid corner {} stored at vertex {vertex}",
                        pair.corner
                    );
                }
                remaining[pair.tree] -= 1;
                if remaining[pair.tree] < 0 {
                    panic!(
                        "vertex-to-tree map incomplete: tree {} referenced more often than it has corners",
                        pair.tree
                    );
                }
            }
        }

        for (tree, count) in remaining.iter().enumerate() {
            if *count != 0 {
                panic!(
                    "vertex-to-tree map incomplete: tree {tree} has {count} unassigned corners"
                );
            }
        }
    }
}

impl DebugInvariants for VertexToTree {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "VertexToTree");
    }

    fn validate_invariants(&self) -> Result<(), ForestMeshError> {
        if !self.is_committed() {
            return Ok(());
        }
        for (vertex, list) in self.iter() {
            if list.is_empty() {
                return Err(ForestMeshError::EmptyTreeList {
                    vertex: vertex.get(),
                });
            }
            if list.windows(2).any(|w| w[0] > w[1]) {
                return Err(ForestMeshError::UnsortedTreeList {
                    vertex: vertex.get(),
                });
            }
        }
        Ok(())
    }
}
