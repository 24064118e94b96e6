//! Coordinator for the global vertex enumeration of a cmesh.

use super::{ConnState, TreeToVertex, VertexToTree};
use crate::cmesh::TreeLayout;
use crate::cmesh::ids::{GlobalVertexId, TreeVertexPair};

/// Validity state of the coordinator's sub-maps.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum VertexConnectivityState {
    #[default]
    Initialized,
    VertexToTreeValid,
    TreeToVertexValid,
    VttAndTtvValid,
}

/// Owns both connectivity maps, keeps them in sync, and serves combined
/// queries.
///
/// The coordinator is bound 1:1 to one cmesh: [`Self::build`] consumes the
/// cmesh's tree layout, commits the tree-to-vertex map, and derives the
/// vertex-to-tree map by inversion. Every getter asserts that the relevant
/// sub-map is valid; a violation is a programmer-contract bug and panics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexConnectivity {
    state: VertexConnectivityState,
    global_number_of_vertices: u64,
    /// Equal to the global count while only the replicated build exists.
    local_number_of_vertices: u64,
    vertex_to_tree: VertexToTree,
    tree_to_vertex: TreeToVertex,
}

impl VertexConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> VertexConnectivityState {
        self.state
    }

    pub fn vertex_to_tree_state(&self) -> ConnState {
        self.vertex_to_tree.state()
    }

    pub fn tree_to_vertex_state(&self) -> ConnState {
        self.tree_to_vertex.state()
    }

    /// True if at least one tree registered vertex ids.
    pub fn has_tree_vertices(&self) -> bool {
        self.tree_to_vertex.has_entries()
    }

    /// Pre-build pass-through: set all global vertex ids of one tree.
    ///
    /// # Panics
    /// Panics if the connectivity is already built, or under the conditions
    /// of [`TreeToVertex::set_global_vertex_ids_of_tree_vertices`].
    pub fn set_global_vertices_of_tree(
        &mut self,
        layout: &TreeLayout,
        tree: usize,
        ids: &[GlobalVertexId],
    ) {
        if self.state != VertexConnectivityState::Initialized {
            panic!("vertex connectivity: setting tree vertices after build");
        }
        self.tree_to_vertex
            .set_global_vertex_ids_of_tree_vertices(layout, tree, ids);
    }

    /// Build both maps: commit tree-to-vertex, derive vertex-to-tree by
    /// inversion over all local and ghost trees of `layout`.
    ///
    /// The build is specified for the replicated case — every process holds
    /// the full cmesh, so no inter-process messages are needed here.
    ///
    /// # Panics
    /// Panics if already built, or if the registered vertex ids are
    /// incomplete (see [`VertexToTree::commit`]).
    pub fn build(&mut self, layout: &TreeLayout) {
        if self.state != VertexConnectivityState::Initialized {
            panic!("vertex connectivity: build called twice");
        }
        self.tree_to_vertex.commit(layout);
        self.state = VertexConnectivityState::TreeToVertexValid;

        self.vertex_to_tree = VertexToTree::from_tree_to_vertex(layout, &self.tree_to_vertex);
        self.global_number_of_vertices = self.vertex_to_tree.num_global_vertices() as u64;
        // TODO: distinguish local from global once a partitioned vertex
        // exchange protocol exists; until then the cmesh is replicated and
        // the counts coincide.
        self.local_number_of_vertices = self.global_number_of_vertices;
        self.state = VertexConnectivityState::VttAndTtvValid;
        log::debug!(
            "built vertex connectivity: {} global vertices over {} trees",
            self.global_number_of_vertices,
            layout.num_trees_and_ghosts()
        );
    }

    fn require_vtt(&self, what: &str) {
        match self.state {
            VertexConnectivityState::VertexToTreeValid | VertexConnectivityState::VttAndTtvValid => {}
            state => panic!("vertex connectivity: {what} requires a valid vertex-to-tree map (state {state:?})"),
        }
    }

    fn require_ttv(&self, what: &str) {
        match self.state {
            VertexConnectivityState::TreeToVertexValid | VertexConnectivityState::VttAndTtvValid => {}
            state => panic!("vertex connectivity: {what} requires a valid tree-to-vertex map (state {state:?})"),
        }
    }

    /// Count of distinct global vertex ids in the cmesh.
    pub fn get_global_number_of_vertices(&self) -> u64 {
        self.require_vtt("get_global_number_of_vertices");
        self.global_number_of_vertices
    }

    /// Process-local vertex count. Replicated-only: equals the global count.
    pub fn get_local_number_of_vertices(&self) -> u64 {
        self.require_vtt("get_local_number_of_vertices");
        self.local_number_of_vertices
    }

    /// The sorted (tree, corner) list referencing a global vertex.
    ///
    /// # Panics
    /// Panics if the vertex-to-tree map is not valid or the vertex is
    /// unknown.
    pub fn get_tree_list_of_vertex(&self, vertex: GlobalVertexId) -> &[TreeVertexPair] {
        self.require_vtt("get_tree_list_of_vertex");
        self.vertex_to_tree.get_tree_list_of_vertex(vertex)
    }

    /// Number of (tree, corner) references at a vertex. A tree contained
    /// multiple times is counted as multiple entries: a quad whose 4 corners
    /// all map to one global vertex yields 4.
    pub fn get_num_trees_at_vertex(&self, vertex: GlobalVertexId) -> usize {
        self.get_tree_list_of_vertex(vertex).len()
    }

    /// Global vertex ids of a tree in corner order; `num_vertices` must match
    /// the tree's corner count.
    pub fn get_global_vertices_of_tree(&self, tree: usize, num_vertices: usize) -> &[GlobalVertexId] {
        self.require_ttv("get_global_vertices_of_tree");
        self.tree_to_vertex.get_global_vertices(tree, num_vertices)
    }

    /// Global vertex id of one corner of a tree.
    pub fn get_global_vertex_of_tree(
        &self,
        tree: usize,
        corner: usize,
        num_vertices: usize,
    ) -> GlobalVertexId {
        self.require_ttv("get_global_vertex_of_tree");
        self.tree_to_vertex.get_global_vertex(tree, corner, num_vertices)
    }

    /// Read access to the committed vertex-to-tree map.
    pub fn vertex_to_tree(&self) -> &VertexToTree {
        &self.vertex_to_tree
    }

    /// Read access to the committed tree-to-vertex map.
    pub fn tree_to_vertex(&self) -> &TreeToVertex {
        &self.tree_to_vertex
    }
}
