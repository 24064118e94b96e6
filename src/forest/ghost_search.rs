//! Ghost discovery: determine which remote elements neighbor the local
//! partition and exchange them with their owners.
//!
//! Discovery is a swappable strategy over one capability — "find the ghosts
//! of a forest". The generic search walks each local element tree top-down,
//! pruning subtrees for which a query predicate rules out remote contact;
//! the face-based variants trade that generality for straight per-leaf
//! scans. All variants produce identical remote tables on balanced forests
//! (neighboring leaves differ by at most one level), which is the caller's
//! contract.
//!
//! [`GhostSearch::do_ghost`] is single-shot per forest: step 1 validates the
//! forest, step 2 runs the selected discovery algorithm, step 3 exchanges
//! the discovered elements with each neighbor rank in a two-phase
//! size-then-data protocol and populates the forest's ghost layer.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use itertools::Itertools;

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WireCount, cast_slice, cast_slice_mut};
use crate::mesh_error::ForestMeshError;

use super::Forest;
use super::element::TreeCell;
use super::ghost::{GhostElement, GhostLayer, GhostType};

/// Search query predicate for ghost discovery.
///
/// Called with the forest, the tree index, the visited cell, and whether the
/// cell is a local leaf. Returning `false` prunes the cell's subtree; the
/// predicate must therefore never return `false` for a region that still
/// contains leaves with remote face neighbors.
pub type SearchQueryFn<const D: usize> =
    Arc<dyn Fn(&Forest<D>, usize, &TreeCell<D>, bool) -> bool + Send + Sync>;

/// Algorithm revision of the face-based ghost discovery.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaceGhostVersion {
    /// Exhaustive per-leaf, per-face owner scan.
    V1,
    /// Per-leaf scan that skips faces whose neighbor region is entirely
    /// local, avoiding owner searches away from the partition boundary.
    V2,
    /// Top-down search with the default remote-contact query.
    V3,
}

#[derive(Clone)]
enum GhostAlgorithm<const D: usize> {
    Search,
    Face(FaceGhostVersion),
    UserDefined(SearchQueryFn<D>),
}

/// A ghost discovery strategy for a forest.
#[derive(Clone)]
pub struct GhostSearch<const D: usize> {
    ghost_type: GhostType,
    algorithm: GhostAlgorithm<D>,
}

const GHOST_BASE_TAG: CommTag = CommTag::new(0xA110);

/// Words per wire entry: tree, level, then one word per coordinate.
const GHOST_ENTRY_WORDS_BASE: usize = 2;

impl<const D: usize> Default for GhostSearch<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> GhostSearch<D> {
    /// The default strategy: face ghosts found by the generic search.
    pub fn new() -> Self {
        GhostSearch {
            ghost_type: GhostType::Faces,
            algorithm: GhostAlgorithm::Search,
        }
    }

    /// Strategy for a given ghost type.
    ///
    /// # Panics
    /// Panics for [`GhostType::UserDefined`] — a search query is required,
    /// use [`Self::with_query`] — and for the unsupported edge/corner types.
    pub fn from_ghost_type(ghost_type: GhostType) -> Self {
        match ghost_type {
            GhostType::None | GhostType::Faces => GhostSearch {
                ghost_type,
                algorithm: GhostAlgorithm::Search,
            },
            GhostType::UserDefined => {
                panic!("user-defined ghost type requires a search query; use GhostSearch::with_query")
            }
            GhostType::Edges | GhostType::Vertices => {
                panic!("ghost type {ghost_type:?} is not supported")
            }
        }
    }

    /// User-defined strategy: the generic search driven by `query`.
    pub fn with_query(query: SearchQueryFn<D>) -> Self {
        GhostSearch {
            ghost_type: GhostType::UserDefined,
            algorithm: GhostAlgorithm::UserDefined(query),
        }
    }

    /// Face-based strategy of the given algorithm revision.
    ///
    /// # Panics
    /// Panics for versions other than 1, 2, or 3.
    pub fn face(version: u8) -> Self {
        let version = match version {
            1 => FaceGhostVersion::V1,
            2 => FaceGhostVersion::V2,
            3 => FaceGhostVersion::V3,
            _ => panic!("unsupported face ghost version {version}"),
        };
        GhostSearch {
            ghost_type: GhostType::Faces,
            algorithm: GhostAlgorithm::Face(version),
        }
    }

    pub fn ghost_type(&self) -> GhostType {
        self.ghost_type
    }

    /// The face algorithm revision, if this is a face-based strategy.
    pub fn face_version(&self) -> Option<FaceGhostVersion> {
        match self.algorithm {
            GhostAlgorithm::Face(version) => Some(version),
            _ => None,
        }
    }

    /// Discover the ghost layer of `forest` and store it there.
    ///
    /// Single-shot: a forest carries at most one ghost layer, and this
    /// method must be called exactly once per forest wanting one. Either it
    /// completes and the forest has a valid ghost layer, or it panics; no
    /// partial state is exposed.
    ///
    /// # Panics
    /// Panics if the forest already has a ghost layer, if the forest's
    /// partition disagrees with the communicator's rank/size, or if the
    /// neighbor exchange fails.
    pub fn do_ghost<C: Communicator>(&self, forest: &mut Forest<D>, comm: &C) {
        // Step 1: validate.
        if forest.ghost().is_some() {
            panic!("do_ghost called twice: forest already has a ghost layer");
        }
        if forest.rank() != comm.rank() || forest.size() != comm.size() {
            panic!(
                "do_ghost: forest partition rank {}/{} does not match communicator rank {}/{}",
                forest.rank(),
                forest.size(),
                comm.rank(),
                comm.size()
            );
        }
        if self.ghost_type == GhostType::None {
            forest.set_ghost(GhostLayer::default());
            return;
        }

        // Step 2: discover remotes with the selected algorithm.
        let remotes = match &self.algorithm {
            GhostAlgorithm::Search => step_2_search(forest, &region_may_touch_remote::<D>),
            GhostAlgorithm::Face(FaceGhostVersion::V1) => step_2_face_v1(forest),
            GhostAlgorithm::Face(FaceGhostVersion::V2) => step_2_face_v2(forest),
            GhostAlgorithm::Face(FaceGhostVersion::V3) => {
                step_2_search(forest, &region_may_touch_remote::<D>)
            }
            GhostAlgorithm::UserDefined(query) => step_2_search(forest, &**query),
        };
        log::debug!(
            "ghost discovery ({:?}): {} remote elements over {} neighbor ranks",
            self.ghost_type,
            remotes.values().map(Vec::len).sum::<usize>(),
            remotes.len()
        );

        // Step 3: exchange with the neighbor ranks.
        let ghosts = match exchange_ghosts(forest, &remotes, comm, GHOST_BASE_TAG) {
            Ok(ghosts) => ghosts,
            Err(err) => panic!("ghost exchange failed: {err}"),
        };
        for (rank, list) in &ghosts {
            log::trace!("received {} ghost elements from rank {rank}", list.len());
        }
        forest.set_ghost(GhostLayer::new(remotes, ghosts));
    }
}

type RemoteTable<const D: usize> = BTreeMap<usize, Vec<GhostElement<D>>>;
type RemoteSets<const D: usize> = BTreeMap<usize, BTreeSet<GhostElement<D>>>;

fn finish_remotes<const D: usize>(sets: RemoteSets<D>) -> RemoteTable<D> {
    sets.into_iter()
        .map(|(rank, set)| (rank, set.into_iter().collect()))
        .collect()
}

/// Exact remote owners of the leaves across every face of a local leaf.
///
/// In a balanced forest the neighbor leaves across a face are the
/// same-level neighbor itself, its parent, or its face-adjacent children.
/// Probing the first-descendant position of each face-adjacent child covers
/// all three cases: a same-level or coarser leaf contains every probe, a
/// finer configuration is hit child by child. Owners of non-adjacent
/// children must not be reported — the exchange posts receives from exactly
/// the ranks found here and relies on the set being symmetric.
fn face_owner_candidates<const D: usize>(
    forest: &Forest<D>,
    ntree: usize,
    ncell: &TreeCell<D>,
    nface: usize,
    owners: &mut Vec<usize>,
) {
    if ncell.level < TreeCell::<D>::MAX_LEVEL {
        for child in ncell.children_at_face(nface) {
            owners.push(forest.owner_of(ntree, &child));
        }
    } else {
        owners.push(forest.owner_of(ntree, ncell));
    }
}

fn leaf_remote_owners<const D: usize>(
    forest: &Forest<D>,
    tree: usize,
    cell: &TreeCell<D>,
) -> Vec<usize> {
    let me = forest.rank();
    let mut owners = Vec::new();
    for face in 0..TreeCell::<D>::num_faces() {
        let Some((ntree, ncell, nface)) = forest.face_neighbor_global(tree, cell, face) else {
            continue;
        };
        face_owner_candidates(forest, ntree, &ncell, nface, &mut owners);
    }
    owners
        .into_iter()
        .filter(|&rank| rank != me)
        .sorted_unstable()
        .dedup()
        .collect()
}

/// Default search query: true iff the region, or one of its face-neighbor
/// regions, may contain elements owned by a remote rank. Sound as a pruning
/// predicate because a descendant's face neighbors stay within the region
/// and its same-level face neighbors.
fn region_may_touch_remote<const D: usize>(
    forest: &Forest<D>,
    tree: usize,
    cell: &TreeCell<D>,
    _is_leaf: bool,
) -> bool {
    let me = forest.rank();
    if forest.owners_of_region(tree, cell).any(|rank| rank != me) {
        return true;
    }
    for face in 0..TreeCell::<D>::num_faces() {
        if let Some((ntree, ncell, _)) = forest.face_neighbor_global(tree, cell, face) {
            if forest.owners_of_region(ntree, &ncell).any(|rank| rank != me) {
                return true;
            }
        }
    }
    false
}

/// Version 1: exhaustive per-leaf scan.
fn step_2_face_v1<const D: usize>(forest: &Forest<D>) -> RemoteTable<D> {
    let mut remotes = RemoteSets::new();
    for (tree, cell) in forest.local_leaf_iter() {
        for owner in leaf_remote_owners(forest, tree, cell) {
            remotes
                .entry(owner)
                .or_default()
                .insert(GhostElement::new(tree, *cell));
        }
    }
    finish_remotes(remotes)
}

/// Version 2: per-leaf scan with a containment prefilter — faces whose
/// neighbor region lies entirely inside the local position range are
/// skipped without any owner search.
fn step_2_face_v2<const D: usize>(forest: &Forest<D>) -> RemoteTable<D> {
    let me = forest.rank();
    let mut remotes = RemoteSets::new();
    for (tree, cell) in forest.local_leaf_iter() {
        for face in 0..TreeCell::<D>::num_faces() {
            let Some((ntree, ncell, nface)) = forest.face_neighbor_global(tree, cell, face) else {
                continue;
            };
            if forest.region_is_local(ntree, &ncell) {
                continue;
            }
            let mut owners = Vec::new();
            face_owner_candidates(forest, ntree, &ncell, nface, &mut owners);
            for owner in owners {
                if owner != me {
                    remotes
                        .entry(owner)
                        .or_default()
                        .insert(GhostElement::new(tree, *cell));
                }
            }
        }
    }
    finish_remotes(remotes)
}

/// Version 3 / generic: top-down recursive descent over each local element
/// tree, splitting the leaf slice among children and pruning subtrees the
/// query rules out.
fn step_2_search<const D: usize>(
    forest: &Forest<D>,
    query: &dyn Fn(&Forest<D>, usize, &TreeCell<D>, bool) -> bool,
) -> RemoteTable<D> {
    let mut remotes = RemoteSets::new();
    for tree in 0..forest.num_trees() {
        let leaves = forest.leaves(tree);
        if !leaves.is_empty() {
            search_recursion(forest, tree, TreeCell::root(), leaves, query, &mut remotes);
        }
    }
    finish_remotes(remotes)
}

fn search_recursion<const D: usize>(
    forest: &Forest<D>,
    tree: usize,
    cell: TreeCell<D>,
    leaves: &[TreeCell<D>],
    query: &dyn Fn(&Forest<D>, usize, &TreeCell<D>, bool) -> bool,
    remotes: &mut RemoteSets<D>,
) {
    if leaves.is_empty() {
        return;
    }
    let is_leaf = leaves.len() == 1 && leaves[0] == cell;
    if !query(forest, tree, &cell, is_leaf) {
        return;
    }
    if is_leaf {
        for owner in leaf_remote_owners(forest, tree, &cell) {
            remotes
                .entry(owner)
                .or_default()
                .insert(GhostElement::new(tree, cell));
        }
        return;
    }
    for child in cell.children() {
        let lo = leaves.partition_point(|leaf| leaf.linear_index() < child.linear_index());
        let hi =
            leaves.partition_point(|leaf| leaf.linear_index() <= child.last_descendant_index());
        search_recursion(forest, tree, child, &leaves[lo..hi], query, remotes);
    }
}

fn encode_remotes<const D: usize>(list: &[GhostElement<D>]) -> Vec<u64> {
    let mut words = Vec::with_capacity(list.len() * (GHOST_ENTRY_WORDS_BASE + D));
    for element in list {
        words.push((element.tree as u64).to_le());
        words.push((element.cell.level as u64).to_le());
        for axis in 0..D {
            words.push((element.cell.coords[axis] as u64).to_le());
        }
    }
    words
}

fn decode_ghosts<const D: usize>(
    neighbor: usize,
    words: &[u64],
    num_trees: usize,
) -> Result<Vec<GhostElement<D>>, ForestMeshError> {
    let stride = GHOST_ENTRY_WORDS_BASE + D;
    if words.len() % stride != 0 {
        return Err(ForestMeshError::InvalidGhostEntry {
            neighbor,
            msg: format!("{} words is not a multiple of the entry stride {stride}", words.len()),
        });
    }
    let mut out = Vec::with_capacity(words.len() / stride);
    for chunk in words.chunks_exact(stride) {
        let tree = u64::from_le(chunk[0]) as usize;
        let level = u64::from_le(chunk[1]);
        if tree >= num_trees {
            return Err(ForestMeshError::InvalidGhostEntry {
                neighbor,
                msg: format!("tree {tree} out of range ({num_trees} trees)"),
            });
        }
        if level > TreeCell::<D>::MAX_LEVEL as u64 {
            return Err(ForestMeshError::InvalidGhostEntry {
                neighbor,
                msg: format!("level {level} exceeds the maximum"),
            });
        }
        let mut coords = [0u32; D];
        for (axis, coord) in coords.iter_mut().enumerate() {
            let raw = u64::from_le(chunk[GHOST_ENTRY_WORDS_BASE + axis]);
            if raw >= (1u64 << level) {
                return Err(ForestMeshError::InvalidGhostEntry {
                    neighbor,
                    msg: format!("coordinate {raw} out of range at level {level}"),
                });
            }
            *coord = raw as u32;
        }
        out.push(GhostElement::new(
            tree,
            TreeCell {
                level: level as u8,
                coords,
            },
        ));
    }
    Ok(out)
}

/// Two-phase symmetric exchange: every neighbor first learns how many
/// entries to expect, then receives the fixed-width entries themselves. All
/// receives are posted before any send; every handle is drained before
/// returning, even on error.
fn exchange_ghosts<const D: usize, C: Communicator>(
    forest: &Forest<D>,
    remotes: &RemoteTable<D>,
    comm: &C,
    base: CommTag,
) -> Result<BTreeMap<usize, Vec<GhostElement<D>>>, ForestMeshError> {
    let size_tag = base;
    let data_tag = base.offset(1);
    let neighbors: Vec<usize> = remotes.keys().copied().collect();

    // Phase 1: counts.
    let mut recv_size: Vec<(usize, C::RecvHandle)> = Vec::new();
    let mut count_bufs: Vec<WireCount> = vec![WireCount::new(0); neighbors.len()];
    for (&nbr, cnt) in neighbors.iter().zip(count_bufs.iter_mut()) {
        let handle = comm.irecv(nbr, size_tag.as_u16(), cast_slice_mut(std::slice::from_mut(cnt)));
        recv_size.push((nbr, handle));
    }
    let mut pending_sends = Vec::with_capacity(neighbors.len());
    let mut send_counts = Vec::with_capacity(neighbors.len());
    for &nbr in &neighbors {
        let count = WireCount::new(remotes[&nbr].len());
        pending_sends.push(comm.isend(
            nbr,
            size_tag.as_u16(),
            cast_slice(std::slice::from_ref(&count)),
        ));
        send_counts.push(count);
    }

    let mut counts_in: BTreeMap<usize, usize> = BTreeMap::new();
    let mut maybe_err = None;
    for (nbr, handle) in recv_size {
        match handle.wait() {
            Some(data) if data.len() == std::mem::size_of::<WireCount>() => {
                if maybe_err.is_none() {
                    let mut cnt = WireCount::new(0);
                    cast_slice_mut(std::slice::from_mut(&mut cnt)).copy_from_slice(&data);
                    counts_in.insert(nbr, cnt.get());
                }
            }
            Some(data) if maybe_err.is_none() => {
                maybe_err = Some(ForestMeshError::BufferSizeMismatch {
                    neighbor: nbr,
                    expected: std::mem::size_of::<WireCount>(),
                    got: data.len(),
                });
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(ForestMeshError::CommError {
                    neighbor: nbr,
                    msg: "failed to receive ghost count".into(),
                });
            }
            _ => {}
        }
    }
    for send in pending_sends {
        let _ = send.wait();
    }
    drop(send_counts);
    if let Some(err) = maybe_err {
        return Err(err);
    }

    // Phase 2: entries.
    let stride = GHOST_ENTRY_WORDS_BASE + D;
    let mut recv_data: Vec<(usize, C::RecvHandle, Vec<u64>)> = Vec::new();
    for &nbr in &neighbors {
        let n_items = counts_in.get(&nbr).copied().unwrap_or(0);
        let mut buffer = vec![0u64; n_items * stride];
        let handle = comm.irecv(nbr, data_tag.as_u16(), cast_slice_mut(&mut buffer));
        recv_data.push((nbr, handle, buffer));
    }
    let mut pending_sends = Vec::with_capacity(neighbors.len());
    let mut send_bufs = Vec::with_capacity(neighbors.len());
    for &nbr in &neighbors {
        let words = encode_remotes(&remotes[&nbr]);
        pending_sends.push(comm.isend(nbr, data_tag.as_u16(), cast_slice(&words)));
        send_bufs.push(words);
    }

    let mut ghosts = BTreeMap::new();
    let mut maybe_err = None;
    for (nbr, handle, mut buffer) in recv_data {
        match handle.wait() {
            Some(data) if data.len() == buffer.len() * std::mem::size_of::<u64>() => {
                if maybe_err.is_none() {
                    cast_slice_mut(&mut buffer).copy_from_slice(&data);
                    match decode_ghosts::<D>(nbr, &buffer, forest.num_trees()) {
                        Ok(list) => {
                            let expected = counts_in.get(&nbr).copied().unwrap_or(0);
                            if list.len() != expected {
                                maybe_err = Some(ForestMeshError::GhostCountMismatch {
                                    neighbor: nbr,
                                    expected,
                                    got: list.len(),
                                });
                            } else if !list.is_empty() {
                                ghosts.insert(nbr, list);
                            }
                        }
                        Err(err) => maybe_err = Some(err),
                    }
                }
            }
            Some(data) if maybe_err.is_none() => {
                maybe_err = Some(ForestMeshError::BufferSizeMismatch {
                    neighbor: nbr,
                    expected: buffer.len() * std::mem::size_of::<u64>(),
                    got: data.len(),
                });
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(ForestMeshError::CommError {
                    neighbor: nbr,
                    msg: "failed to receive ghost entries".into(),
                });
            }
            _ => {}
        }
    }
    for send in pending_sends {
        let _ = send.wait();
    }
    drop(send_bufs);

    if let Some(err) = maybe_err {
        Err(err)
    } else {
        Ok(ghosts)
    }
}
