//! The forest: a partitioned collection of refined tree elements derived
//! from a committed cmesh.
//!
//! Elements live in a global space-filling-curve order, tree-major. Each
//! rank owns one contiguous range of that order and stores only its own
//! leaves; the partition is described by one marker per rank — the position
//! of the first element it owns — so any rank can resolve the owner of an
//! arbitrary element region by binary search without global leaf knowledge.

pub mod element;
pub mod ghost;
pub mod ghost_search;

pub use element::TreeCell;
pub use ghost::{GhostElement, GhostLayer, GhostType};
pub use ghost_search::{FaceGhostVersion, GhostSearch, SearchQueryFn};

use crate::cmesh::CMesh;
use crate::cmesh::eclass::Eclass;

/// Global position of an element region in the forest's space-filling-curve
/// order: tree-major, then the element's linear index within the tree.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ElementPos {
    pub tree: usize,
    pub index: u64,
}

impl ElementPos {
    pub const fn new(tree: usize, index: u64) -> Self {
        ElementPos { tree, index }
    }
}

/// Forest of refined tree elements for quadtrees (`D = 2`) or octrees
/// (`D = 3`).
#[derive(Debug)]
pub struct Forest<const D: usize> {
    cmesh: CMesh,
    /// Local leaves per (global) tree index, sorted by linear index.
    trees: Vec<Vec<TreeCell<D>>>,
    /// Partition markers: `partition[r]` is the position of the first
    /// element owned by rank `r`; `partition[size]` is the end sentinel.
    partition: Vec<ElementPos>,
    rank: usize,
    size: usize,
    ghost: Option<GhostLayer<D>>,
}

/// A quadtree forest (`D = 2`).
pub type QuadForest = Forest<2>;
/// An octree forest (`D = 3`).
pub type OctForest = Forest<3>;

impl<const D: usize> Forest<D> {
    fn expected_class() -> Eclass {
        match D {
            2 => Eclass::Quad,
            3 => Eclass::Hex,
            _ => panic!("forest supports D = 2 or D = 3, got {D}"),
        }
    }

    fn check_cmesh(cmesh: &CMesh) {
        if !cmesh.is_committed() {
            panic!("forest requires a committed cmesh");
        }
        let expected = Self::expected_class();
        for tree in 0..cmesh.num_local_trees() {
            let class = cmesh.tree_class(tree);
            if class != expected {
                panic!("forest over D={D} requires {expected:?} trees, tree {tree} is {class:?}");
            }
        }
    }

    /// Uniformly refined forest at `level`, elements split evenly over
    /// `size` ranks in space-filling-curve order.
    ///
    /// # Panics
    /// Panics if the cmesh is not committed, a tree class does not match the
    /// forest dimension, `rank >= size`, or `level` exceeds
    /// [`TreeCell::MAX_LEVEL`].
    pub fn new_uniform(cmesh: CMesh, level: u8, rank: usize, size: usize) -> Self {
        Self::check_cmesh(&cmesh);
        if size == 0 || rank >= size {
            panic!("invalid partition: rank {rank} of {size}");
        }
        if level > TreeCell::<D>::MAX_LEVEL {
            panic!("level {level} exceeds the maximum of {}", TreeCell::<D>::MAX_LEVEL);
        }
        let num_trees = cmesh.num_local_trees();
        let per_tree = TreeCell::<D>::num_cells_at_level(level);
        let total = per_tree * num_trees as u64;

        let global_pos = |g: u64| -> ElementPos {
            if g >= total {
                ElementPos::new(num_trees, 0)
            } else {
                let tree = (g / per_tree) as usize;
                let cell = TreeCell::<D>::from_morton(level, g % per_tree);
                ElementPos::new(tree, cell.linear_index())
            }
        };

        let split = |r: usize| -> u64 {
            ((total as u128 * r as u128) / size as u128) as u64
        };

        let partition: Vec<ElementPos> = (0..=size).map(|r| global_pos(split(r))).collect();

        let mut trees = vec![Vec::new(); num_trees];
        for g in split(rank)..split(rank + 1) {
            let tree = (g / per_tree) as usize;
            trees[tree].push(TreeCell::<D>::from_morton(level, g % per_tree));
        }

        log::debug!(
            "uniform forest: level {level}, {} trees, {} global elements, rank {rank}/{size}",
            num_trees,
            total
        );

        Forest {
            cmesh,
            trees,
            partition,
            rank,
            size,
            ghost: None,
        }
    }

    /// Forest from explicit local leaves and partition markers (for refined
    /// partitions produced elsewhere). Leaves are sorted per tree; the
    /// markers must be non-decreasing, start at the origin, and end with the
    /// sentinel `(num_trees, 0)`.
    ///
    /// # Panics
    /// Panics on a malformed partition or tree count.
    pub fn from_local_leaves(
        cmesh: CMesh,
        mut trees: Vec<Vec<TreeCell<D>>>,
        partition: Vec<ElementPos>,
        rank: usize,
        size: usize,
    ) -> Self {
        Self::check_cmesh(&cmesh);
        if size == 0 || rank >= size {
            panic!("invalid partition: rank {rank} of {size}");
        }
        if trees.len() != cmesh.num_local_trees() {
            panic!(
                "expected {} per-tree leaf lists, got {}",
                cmesh.num_local_trees(),
                trees.len()
            );
        }
        if partition.len() != size + 1 {
            panic!("expected {} partition markers, got {}", size + 1, partition.len());
        }
        if partition[0] != ElementPos::new(0, 0) {
            panic!("partition must start at the origin");
        }
        if partition[size].tree != cmesh.num_local_trees() {
            panic!("partition must end with the sentinel marker");
        }
        if partition.windows(2).any(|w| w[0] > w[1]) {
            panic!("partition markers must be non-decreasing");
        }
        for leaves in &mut trees {
            leaves.sort_unstable_by_key(|cell| cell.linear_index());
        }
        Forest {
            cmesh,
            trees,
            partition,
            rank,
            size,
            ghost: None,
        }
    }

    pub fn cmesh(&self) -> &CMesh {
        &self.cmesh
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Local leaves of one tree, in space-filling-curve order.
    pub fn leaves(&self, tree: usize) -> &[TreeCell<D>] {
        &self.trees[tree]
    }

    /// Iterate all local leaves as (tree, cell).
    pub fn local_leaf_iter(&self) -> impl Iterator<Item = (usize, &TreeCell<D>)> {
        self.trees
            .iter()
            .enumerate()
            .flat_map(|(tree, leaves)| leaves.iter().map(move |cell| (tree, cell)))
    }

    pub fn num_local_elements(&self) -> usize {
        self.trees.iter().map(Vec::len).sum()
    }

    /// The ghost layer, once built by [`GhostSearch::do_ghost`].
    pub fn ghost(&self) -> Option<&GhostLayer<D>> {
        self.ghost.as_ref()
    }

    pub(crate) fn set_ghost(&mut self, layer: GhostLayer<D>) {
        debug_assert!(self.ghost.is_none());
        self.ghost = Some(layer);
    }

    /// The half-open position range `[first, end)` owned by this rank.
    pub fn local_range(&self) -> (ElementPos, ElementPos) {
        (self.partition[self.rank], self.partition[self.rank + 1])
    }

    /// Owning rank of the element at `pos`.
    pub fn owner_of_pos(&self, pos: ElementPos) -> usize {
        debug_assert!(pos < self.partition[self.size], "position beyond the forest");
        self.partition.partition_point(|marker| *marker <= pos) - 1
    }

    /// Owning rank of the leaf containing the first descendant of `cell`.
    pub fn owner_of(&self, tree: usize, cell: &TreeCell<D>) -> usize {
        self.owner_of_pos(ElementPos::new(tree, cell.linear_index()))
    }

    /// All ranks owning elements inside the region of `cell` (inclusive rank
    /// range; ranks own contiguous position ranges).
    pub fn owners_of_region(&self, tree: usize, cell: &TreeCell<D>) -> std::ops::RangeInclusive<usize> {
        let first = self.owner_of_pos(ElementPos::new(tree, cell.linear_index()));
        let last = self.owner_of_pos(ElementPos::new(tree, cell.last_descendant_index()));
        first..=last
    }

    /// True if the whole region of `cell` is owned by this rank.
    pub fn region_is_local(&self, tree: usize, cell: &TreeCell<D>) -> bool {
        let (lo, hi) = self.local_range();
        let first = ElementPos::new(tree, cell.linear_index());
        let last = ElementPos::new(tree, cell.last_descendant_index());
        lo <= first && last < hi
    }

    /// The face-neighbor region of `cell` across `face`, following cmesh
    /// joins over tree boundaries. Returns the neighbor tree, the same-level
    /// neighbor cell, and the neighbor's face toward `cell`; `None` on the
    /// domain boundary.
    pub fn face_neighbor_global(
        &self,
        tree: usize,
        cell: &TreeCell<D>,
        face: usize,
    ) -> Option<(usize, TreeCell<D>, usize)> {
        if let Some(neighbor) = cell.face_neighbor(face) {
            return Some((tree, neighbor, face ^ 1));
        }
        let (ntree, nface) = self.cmesh.join(tree, face)?;
        Some((ntree, transform_across_join(cell, face, nface), nface))
    }

    /// Refine every local leaf for which `should_refine` returns true,
    /// replacing it by its `2^D` children. Returns the number of refined
    /// leaves. Ownership is unaffected: children stay within the parent's
    /// position range.
    ///
    /// # Panics
    /// Panics if a ghost layer has already been built — refinement would
    /// invalidate it; build ghosts on the final forest.
    pub fn refine<F>(&mut self, should_refine: F) -> usize
    where
        F: Fn(usize, &TreeCell<D>) -> bool,
    {
        if self.ghost.is_some() {
            panic!("refine called on a forest that already has a ghost layer");
        }
        let mut refined = 0;
        for (tree, leaves) in self.trees.iter_mut().enumerate() {
            let mut next = Vec::with_capacity(leaves.len());
            for leaf in leaves.iter() {
                if should_refine(tree, leaf) {
                    next.extend(leaf.children());
                    refined += 1;
                } else {
                    next.push(*leaf);
                }
            }
            *leaves = next;
        }
        refined
    }
}

/// Map a cell exiting through `face` onto the joined tree entered through
/// `nface`, for identity-orientation joins: the entering axis coordinate is
/// pinned to the wall, the remaining axes transfer in increasing order.
fn transform_across_join<const D: usize>(
    cell: &TreeCell<D>,
    face: usize,
    nface: usize,
) -> TreeCell<D> {
    let axis_out = face / 2;
    let axis_in = nface / 2;
    let extent = 1u32 << cell.level;
    let mut coords = [0u32; D];
    coords[axis_in] = if nface % 2 == 1 { extent - 1 } else { 0 };
    let other_out = (0..D).filter(|&a| a != axis_out);
    let other_in = (0..D).filter(|&a| a != axis_in);
    for (ao, ai) in other_out.zip(other_in) {
        coords[ai] = cell.coords[ao];
    }
    TreeCell {
        level: cell.level,
        coords,
    }
}
