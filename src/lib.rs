//! # forest-mesh
//!
//! forest-mesh is a Rust library for managing a distributed forest of adaptively
//! refined tree-structured meshes, designed as the mesh backbone of parallel PDE
//! solvers. It provides a coarse mesh of tree roots (the *cmesh*), a globally
//! consistent vertex numbering shared across trees, a partitioned forest of leaf
//! elements, and ghost-layer discovery for halo exchange across process
//! boundaries.
//!
//! ## Features
//! - Coarse mesh with element classes, face joins, and a commit state machine
//! - Bidirectional global-vertex ↔ (tree, corner) connectivity maps with
//!   canonical, deterministic ordering
//! - Space-filling-curve partitioned forests of quad/oct tree elements
//! - Pluggable ghost discovery strategies (generic search, face-based variants,
//!   user-defined search queries)
//! - Pluggable communication backends (serial, in-process) for ghost exchange
//!
//! ## State discipline
//!
//! The connectivity maps and the cmesh follow a strict `Initialized → Committed`
//! state machine. Insertions are only legal before commit; queries are only
//! legal after. Violations are programmer errors and panic with a diagnostic —
//! they are never surfaced as recoverable [`mesh_error::ForestMeshError`]
//! values. Committed structures are immutable and therefore safe for concurrent
//! read-only use.
//!
//! ## Determinism
//!
//! Vertex buckets are sorted into canonical (tree, corner) order at commit and
//! stored in ordered maps, so query results are identical across processes.
//! Tests that use randomness fix `SmallRng` seeds explicitly.

// Re-export our major subsystems:
pub mod algs;
pub mod cmesh;
pub mod debug_invariants;
pub mod forest;
pub mod mesh_error;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{CommTag, Communicator, LocalComm, NoComm, Wait};
    pub use crate::cmesh::eclass::Eclass;
    pub use crate::cmesh::ids::{GlobalVertexId, TreeVertexPair};
    pub use crate::cmesh::vertex_conn::{
        ConnState, TreeToVertex, VertexConnectivity, VertexConnectivityState, VertexToTree,
    };
    pub use crate::cmesh::{CMesh, CMeshState, TreeLayout};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::forest::element::TreeCell;
    pub use crate::forest::ghost::{GhostElement, GhostLayer, GhostType};
    pub use crate::forest::ghost_search::{FaceGhostVersion, GhostSearch, SearchQueryFn};
    pub use crate::forest::{ElementPos, Forest, OctForest, QuadForest};
    pub use crate::mesh_error::ForestMeshError;
}
