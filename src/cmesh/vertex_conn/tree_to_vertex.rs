//! Tree-to-vertex map: per tree, the global vertex id of each local corner.

use super::ConnState;
use crate::cmesh::TreeLayout;
use crate::cmesh::ids::GlobalVertexId;

/// Stores, for each local or ghost tree, the ordered sequence of global
/// vertex ids assigned to its corners.
///
/// This is the dual structure of [`super::VertexToTree`], which is derived
/// from it by inversion. Storage is direct indexed access per tree; the map
/// carries no algorithmic machinery of its own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeToVertex {
    entries: Vec<Option<Vec<GlobalVertexId>>>,
    state: ConnState,
}

impl TreeToVertex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn is_committed(&self) -> bool {
        self.state == ConnState::Committed
    }

    /// True if at least one tree has a vertex-id assignment.
    pub fn has_entries(&self) -> bool {
        self.entries.iter().any(|entry| entry.is_some())
    }

    /// Set all global vertex ids of a tree's corners, in corner order.
    /// Overwrites any previous assignment for the tree.
    ///
    /// # Panics
    /// Panics if the map is committed, if `tree` is not a valid local or
    /// ghost index of `layout`, or if `ids.len()` differs from the corner
    /// count of the tree's element class.
    pub fn set_global_vertex_ids_of_tree_vertices(
        &mut self,
        layout: &TreeLayout,
        tree: usize,
        ids: &[GlobalVertexId],
    ) {
        if self.is_committed() {
            panic!("tree-to-vertex map: trying to set vertex ids of tree {tree} after commit");
        }
        if !layout.is_valid_tree(tree) {
            panic!(
                "tree-to-vertex map: tree index {tree} out of range ({} trees and ghosts)",
                layout.num_trees_and_ghosts()
            );
        }
        let num_corners = layout.class_of(tree).num_vertices();
        if ids.len() != num_corners {
            panic!(
                "tree-to-vertex map: tree {tree} has {num_corners} corners, got {} vertex ids",
                ids.len()
            );
        }
        if tree >= self.entries.len() {
            self.entries.resize(tree + 1, None);
        }
        self.entries[tree] = Some(ids.to_vec());
    }

    /// Mark the map committed. Every local and ghost tree of `layout` must
    /// have an assignment.
    ///
    /// # Panics
    /// Panics if already committed or if any tree has no vertex ids.
    pub fn commit(&mut self, layout: &TreeLayout) {
        if self.is_committed() {
            panic!("tree-to-vertex map: commit called twice");
        }
        for tree in 0..layout.num_trees_and_ghosts() {
            let present = matches!(self.entries.get(tree), Some(Some(_)));
            if !present {
                panic!("tree-to-vertex map: tree {tree} has no vertex ids assigned at commit");
            }
        }
        self.state = ConnState::Committed;
    }

    /// The stored vertex-id sequence of a tree. `num_vertices` is the corner
    /// count the caller expects and must match the stored length.
    ///
    /// # Panics
    /// Panics if the map is not committed, the tree is unknown, or
    /// `num_vertices` mismatches.
    pub fn get_global_vertices(&self, tree: usize, num_vertices: usize) -> &[GlobalVertexId] {
        if !self.is_committed() {
            panic!("tree-to-vertex map: get_global_vertices before commit");
        }
        let ids = match self.entries.get(tree) {
            Some(Some(ids)) => ids,
            _ => panic!("tree-to-vertex map: no entry for tree {tree}"),
        };
        if ids.len() != num_vertices {
            panic!(
                "tree-to-vertex map: tree {tree} stores {} vertices, caller expected {num_vertices}",
                ids.len()
            );
        }
        ids
    }

    /// The global vertex id of one corner of a tree.
    ///
    /// # Panics
    /// Panics under the same conditions as [`Self::get_global_vertices`], or
    /// if `corner` is out of range.
    pub fn get_global_vertex(
        &self,
        tree: usize,
        corner: usize,
        num_vertices: usize,
    ) -> GlobalVertexId {
        let ids = self.get_global_vertices(tree, num_vertices);
        match ids.get(corner) {
            Some(&id) => id,
            None => panic!(
                "tree-to-vertex map: corner {corner} out of range for tree {tree} ({} corners)",
                ids.len()
            ),
        }
    }
}
