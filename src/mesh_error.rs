//! ForestMeshError: unified error type for forest-mesh fallible plumbing.
//!
//! This type covers the recoverable layers of the library: communication
//! during ghost exchange and invariant validation reports. Contract
//! violations (insert-after-commit, queries before build, out-of-range
//! indices) are programmer bugs and panic instead; see the crate docs.

use thiserror::Error;

/// Unified error type for forest-mesh operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForestMeshError {
    /// A point-to-point exchange with a neighbor rank failed.
    #[error("communication with rank {neighbor} failed: {msg}")]
    CommError { neighbor: usize, msg: String },
    /// A neighbor sent a differently sized buffer than announced.
    #[error("rank {neighbor} sent {got} bytes, expected {expected}")]
    BufferSizeMismatch {
        neighbor: usize,
        expected: usize,
        got: usize,
    },
    /// A neighbor announced one ghost count but delivered another.
    #[error("rank {neighbor} announced {expected} ghost entries but sent {got}")]
    GhostCountMismatch {
        neighbor: usize,
        expected: usize,
        got: usize,
    },
    /// A ghost entry decoded from the wire refers to an unknown tree or level.
    #[error("rank {neighbor} sent an invalid ghost entry: {msg}")]
    InvalidGhostEntry { neighbor: usize, msg: String },
    /// A committed vertex bucket is not in canonical (tree, corner) order.
    #[error("vertex {vertex} has an unsorted tree list")]
    UnsortedTreeList { vertex: u64 },
    /// A committed vertex bucket is empty.
    #[error("vertex {vertex} has an empty tree list")]
    EmptyTreeList { vertex: u64 },
}
