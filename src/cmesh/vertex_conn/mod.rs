//! Global vertex connectivity of a cmesh.
//!
//! Two dual index structures describe which global vertices a tree touches:
//!
//! - [`TreeToVertex`]: per tree, the ordered global vertex ids of its corners.
//! - [`VertexToTree`]: per global vertex id, the sorted list of (tree, corner)
//!   pairs referencing it.
//!
//! The [`VertexConnectivity`] coordinator owns both maps, keeps them in sync,
//! and serves the combined queries. All three follow a one-way
//! `Initialized → Committed` state machine; insertion after commit and queries
//! before commit are contract violations and panic.

pub mod connectivity;
pub mod tree_to_vertex;
pub mod vertex_to_tree;

pub use connectivity::{VertexConnectivity, VertexConnectivityState};
pub use tree_to_vertex::TreeToVertex;
pub use vertex_to_tree::VertexToTree;

/// Lifecycle state shared by both connectivity maps.
///
/// The only transition is `Initialized → Committed`, performed by `commit`.
/// There is no way back: to rebuild, create a fresh instance.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnState {
    #[default]
    Initialized,
    Committed,
}
