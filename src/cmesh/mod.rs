//! Coarse mesh: the unrefined collection of connected tree roots defining
//! global mesh topology.
//!
//! A [`CMesh`] is assembled in the `Initialized` state — trees, ghost trees,
//! face joins, and per-tree global vertex ids are registered — and then
//! committed exactly once. Commit is a one-way transition: afterwards the mesh
//! is immutable and only queries are legal. If any tree registered vertex ids,
//! commit also builds the [`vertex_conn::VertexConnectivity`] for the mesh and
//! validates its completeness.
//!
//! The cmesh in this crate is replicated: every process holds the full tree
//! layout, so no communication happens at commit time.

pub mod eclass;
pub mod ids;
pub mod vertex_conn;

use std::collections::HashMap;

use eclass::Eclass;
use ids::{GlobalVertexId, TreeVertexPair};
use vertex_conn::{VertexConnectivity, VertexConnectivityState};

/// The tree layout of a cmesh: element classes of local trees followed by
/// ghost trees.
///
/// Tree indices address local trees in `[0, num_local_trees)` and ghost trees
/// in `[num_local_trees, num_local_trees + num_ghost_trees)`. The layout is a
/// plain view onto the cmesh so the connectivity maps can validate indices and
/// corner counts without holding a reference to the cmesh itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeLayout {
    local_classes: Vec<Eclass>,
    ghost_classes: Vec<Eclass>,
}

impl TreeLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a local tree and return its index.
    ///
    /// # Panics
    /// Panics if ghost trees have already been added; ghost indices follow
    /// the local range and must not be invalidated.
    pub fn push_local(&mut self, class: Eclass) -> usize {
        if !self.ghost_classes.is_empty() {
            panic!("local trees must be added before ghost trees");
        }
        self.local_classes.push(class);
        self.local_classes.len() - 1
    }

    /// Append a ghost tree and return its index (offset past the local trees).
    pub fn push_ghost(&mut self, class: Eclass) -> usize {
        self.ghost_classes.push(class);
        self.local_classes.len() + self.ghost_classes.len() - 1
    }

    pub fn num_local_trees(&self) -> usize {
        self.local_classes.len()
    }

    pub fn num_ghost_trees(&self) -> usize {
        self.ghost_classes.len()
    }

    pub fn num_trees_and_ghosts(&self) -> usize {
        self.local_classes.len() + self.ghost_classes.len()
    }

    /// True if `tree` addresses a local or ghost tree of this layout.
    pub fn is_valid_tree(&self, tree: usize) -> bool {
        tree < self.num_trees_and_ghosts()
    }

    /// True if `tree` addresses a local (owned) tree.
    pub fn is_local_tree(&self, tree: usize) -> bool {
        tree < self.local_classes.len()
    }

    /// Element class of a local or ghost tree.
    ///
    /// # Panics
    /// Panics if `tree` is out of range.
    pub fn class_of(&self, tree: usize) -> Eclass {
        if tree < self.local_classes.len() {
            self.local_classes[tree]
        } else if tree < self.num_trees_and_ghosts() {
            self.ghost_classes[tree - self.local_classes.len()]
        } else {
            panic!(
                "tree index {tree} out of range: layout has {} trees and ghosts",
                self.num_trees_and_ghosts()
            );
        }
    }
}

/// Lifecycle state of a [`CMesh`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CMeshState {
    Initialized,
    Committed,
}

/// The coarse mesh: tree roots, face joins, and (after commit) the global
/// vertex connectivity.
#[derive(Debug)]
pub struct CMesh {
    layout: TreeLayout,
    /// Face join table, stored in both directions: (tree, face) -> (tree, face).
    joins: HashMap<(usize, usize), (usize, usize)>,
    conn: VertexConnectivity,
    state: CMeshState,
}

impl Default for CMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl CMesh {
    pub fn new() -> Self {
        CMesh {
            layout: TreeLayout::new(),
            joins: HashMap::new(),
            conn: VertexConnectivity::new(),
            state: CMeshState::Initialized,
        }
    }

    pub fn state(&self) -> CMeshState {
        self.state
    }

    pub fn is_committed(&self) -> bool {
        self.state == CMeshState::Committed
    }

    fn require_initialized(&self, what: &str) {
        if self.is_committed() {
            panic!("{what} on a committed cmesh");
        }
    }

    fn require_committed(&self, what: &str) {
        if !self.is_committed() {
            panic!("{what} requires a committed cmesh");
        }
    }

    /// Add a local tree of the given class; returns its tree index.
    ///
    /// # Panics
    /// Panics if the cmesh is committed.
    pub fn add_tree(&mut self, class: Eclass) -> usize {
        self.require_initialized("add_tree");
        self.layout.push_local(class)
    }

    /// Add a ghost tree (a neighbor-owned tree cached locally); returns its
    /// tree index, which follows the local tree range.
    ///
    /// # Panics
    /// Panics if the cmesh is committed.
    pub fn add_ghost_tree(&mut self, class: Eclass) -> usize {
        self.require_initialized("add_ghost_tree");
        self.layout.push_ghost(class)
    }

    /// Join `face_a` of local tree `tree_a` with `face_b` of local tree
    /// `tree_b` (identity orientation). The join is symmetric.
    ///
    /// # Panics
    /// Panics if the cmesh is committed, if either tree or face index is out
    /// of range, or if either face already carries a join.
    pub fn set_join(&mut self, tree_a: usize, face_a: usize, tree_b: usize, face_b: usize) {
        self.require_initialized("set_join");
        for &(tree, face) in &[(tree_a, face_a), (tree_b, face_b)] {
            if !self.layout.is_local_tree(tree) {
                panic!("set_join: tree {tree} is not a local tree");
            }
            let nf = self.layout.class_of(tree).num_faces();
            if face >= nf {
                panic!("set_join: face {face} out of range for tree {tree} ({nf} faces)");
            }
        }
        if self.joins.contains_key(&(tree_a, face_a)) || self.joins.contains_key(&(tree_b, face_b))
        {
            panic!("set_join: face already joined");
        }
        self.joins.insert((tree_a, face_a), (tree_b, face_b));
        self.joins.insert((tree_b, face_b), (tree_a, face_a));
    }

    /// The (tree, face) joined to `(tree, face)`, if any.
    pub fn join(&self, tree: usize, face: usize) -> Option<(usize, usize)> {
        self.joins.get(&(tree, face)).copied()
    }

    /// Set all global vertex ids of a local tree, in corner order.
    ///
    /// `ids` must hold exactly one id per corner of the tree's element class.
    /// Ghost-tree assignments go through [`VertexConnectivity`] directly.
    ///
    /// # Panics
    /// Panics if the cmesh is committed, if `tree` is not a local tree, or if
    /// `ids` has the wrong length.
    pub fn set_global_vertices_of_tree(&mut self, tree: usize, ids: &[GlobalVertexId]) {
        self.require_initialized("set_global_vertices_of_tree");
        if !self.layout.is_local_tree(tree) {
            panic!("set_global_vertices_of_tree: tree {tree} is not a local tree");
        }
        self.conn
            .set_global_vertices_of_tree(&self.layout, tree, ids);
    }

    /// Commit the cmesh. One-way transition; afterwards only queries are
    /// legal. Builds the vertex connectivity if any tree registered vertex
    /// ids, validating that then *every* tree did.
    ///
    /// # Panics
    /// Panics if already committed, or if the registered vertex ids are
    /// incomplete or inconsistent.
    pub fn commit(&mut self) {
        self.require_initialized("commit");
        log::debug!(
            "committing cmesh: {} local trees, {} ghost trees, {} joins",
            self.layout.num_local_trees(),
            self.layout.num_ghost_trees(),
            self.joins.len() / 2
        );
        if self.conn.has_tree_vertices() {
            self.conn.build(&self.layout);
        }
        self.state = CMeshState::Committed;
    }

    pub fn num_local_trees(&self) -> usize {
        self.layout.num_local_trees()
    }

    pub fn num_ghost_trees(&self) -> usize {
        self.layout.num_ghost_trees()
    }

    /// Element class of a local or ghost tree.
    pub fn tree_class(&self, tree: usize) -> Eclass {
        self.layout.class_of(tree)
    }

    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    /// The vertex connectivity of this cmesh.
    pub fn vertex_connectivity(&self) -> &VertexConnectivity {
        &self.conn
    }

    pub fn vertex_connectivity_state(&self) -> VertexConnectivityState {
        self.conn.state()
    }

    // --- committed-only vertex queries (the public query surface) ---

    /// Number of distinct global vertex ids of the mesh.
    pub fn get_num_global_vertices(&self) -> u64 {
        self.require_committed("get_num_global_vertices");
        self.conn.get_global_number_of_vertices()
    }

    /// Process-local number of vertices. Equals the global count while the
    /// vertex connectivity is replicated-only.
    pub fn get_num_local_vertices(&self) -> u64 {
        self.require_committed("get_num_local_vertices");
        self.conn.get_local_number_of_vertices()
    }

    /// Global vertex ids of a tree, in corner order. `num_vertices` must
    /// match the tree's corner count.
    pub fn get_global_vertices_of_tree(&self, tree: usize, num_vertices: usize) -> &[GlobalVertexId] {
        self.require_committed("get_global_vertices_of_tree");
        self.conn.get_global_vertices_of_tree(tree, num_vertices)
    }

    /// Global vertex id of one corner of a tree.
    pub fn get_global_vertex_of_tree(
        &self,
        tree: usize,
        corner: usize,
        num_vertices: usize,
    ) -> GlobalVertexId {
        self.require_committed("get_global_vertex_of_tree");
        self.conn.get_global_vertex_of_tree(tree, corner, num_vertices)
    }

    /// Number of (tree, corner) references at a global vertex. A tree whose
    /// corners coincide at the vertex is counted once per corner.
    pub fn get_num_trees_at_vertex(&self, vertex: GlobalVertexId) -> usize {
        self.require_committed("get_num_trees_at_vertex");
        self.conn.get_num_trees_at_vertex(vertex)
    }

    /// The sorted list of (tree, corner) pairs referencing a global vertex.
    pub fn get_vertex_to_tree_list(&self, vertex: GlobalVertexId) -> &[TreeVertexPair] {
        self.require_committed("get_vertex_to_tree_list");
        self.conn.get_tree_list_of_vertex(vertex)
    }
}
