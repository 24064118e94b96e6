//! Ghost layer storage: remote elements cached locally and local elements
//! mirrored to neighbor ranks.

use std::collections::BTreeMap;

use itertools::Itertools;

use super::element::TreeCell;

/// Which neighbor relation defines the ghost layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GhostType {
    /// No ghost elements are collected.
    None,
    /// Face-neighbor elements across the partition boundary.
    Faces,
    /// Edge neighbors (not supported yet).
    Edges,
    /// Corner neighbors (not supported yet).
    Vertices,
    /// Neighborhood defined by a user-supplied search query.
    UserDefined,
}

/// One element identified by its tree and cell; the owning rank is the key
/// of the surrounding map.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GhostElement<const D: usize> {
    pub tree: usize,
    pub cell: TreeCell<D>,
}

impl<const D: usize> GhostElement<D> {
    pub const fn new(tree: usize, cell: TreeCell<D>) -> Self {
        GhostElement { tree, cell }
    }
}

/// The populated ghost layer of a forest.
///
/// `remotes` holds, per neighbor rank, the local elements that rank caches
/// as its ghosts; `ghosts` holds, per neighbor rank, the elements received
/// from it. Both sides store canonically sorted lists, so two layers built
/// from the same forest compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GhostLayer<const D: usize> {
    remotes: BTreeMap<usize, Vec<GhostElement<D>>>,
    ghosts: BTreeMap<usize, Vec<GhostElement<D>>>,
}

impl<const D: usize> GhostLayer<D> {
    pub(crate) fn new(
        remotes: BTreeMap<usize, Vec<GhostElement<D>>>,
        ghosts: BTreeMap<usize, Vec<GhostElement<D>>>,
    ) -> Self {
        GhostLayer { remotes, ghosts }
    }

    /// Neighbor ranks appearing on either side of the layer, ascending.
    pub fn neighbor_ranks(&self) -> Vec<usize> {
        self.remotes
            .keys()
            .chain(self.ghosts.keys())
            .copied()
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// Elements received from `rank` (its elements cached here).
    pub fn ghosts_from(&self, rank: usize) -> &[GhostElement<D>] {
        self.ghosts.get(&rank).map_or(&[], Vec::as_slice)
    }

    /// Local elements that `rank` caches as ghosts.
    pub fn remotes_to(&self, rank: usize) -> &[GhostElement<D>] {
        self.remotes.get(&rank).map_or(&[], Vec::as_slice)
    }

    pub fn num_ghost_elements(&self) -> usize {
        self.ghosts.values().map(Vec::len).sum()
    }

    pub fn num_remote_elements(&self) -> usize {
        self.remotes.values().map(Vec::len).sum()
    }

    /// Iterate all ghost elements as (owner rank, element).
    pub fn iter_ghosts(&self) -> impl Iterator<Item = (usize, &GhostElement<D>)> {
        self.ghosts
            .iter()
            .flat_map(|(&rank, list)| list.iter().map(move |element| (rank, element)))
    }

    /// Iterate all remote-mirrored local elements as (destination rank,
    /// element).
    pub fn iter_remotes(&self) -> impl Iterator<Item = (usize, &GhostElement<D>)> {
        self.remotes
            .iter()
            .flat_map(|(&rank, list)| list.iter().map(move |element| (rank, element)))
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty() && self.ghosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(level: u8, x: u32, y: u32) -> TreeCell<2> {
        TreeCell {
            level,
            coords: [x, y],
        }
    }

    #[test]
    fn neighbor_ranks_deduplicated() {
        let mut remotes = BTreeMap::new();
        remotes.insert(1, vec![GhostElement::new(0, cell(1, 0, 0))]);
        let mut ghosts = BTreeMap::new();
        ghosts.insert(1, vec![GhostElement::new(0, cell(1, 1, 0))]);
        ghosts.insert(2, vec![GhostElement::new(0, cell(1, 0, 1))]);
        let layer = GhostLayer::new(remotes, ghosts);

        assert_eq!(layer.neighbor_ranks(), vec![1, 2]);
        assert_eq!(layer.num_ghost_elements(), 2);
        assert_eq!(layer.num_remote_elements(), 1);
        assert_eq!(layer.ghosts_from(3), &[]);
    }

    #[test]
    fn empty_layer() {
        let layer: GhostLayer<2> = GhostLayer::default();
        assert!(layer.is_empty());
        assert_eq!(layer.neighbor_ranks(), Vec::<usize>::new());
    }
}
