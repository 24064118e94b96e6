use std::sync::Arc;
use std::thread;

use forest_mesh::prelude::*;
use serial_test::serial;

fn single_quad_cmesh() -> CMesh {
    let mut cmesh = CMesh::new();
    cmesh.add_tree(Eclass::Quad);
    cmesh.commit();
    cmesh
}

fn joined_quad_cmesh() -> CMesh {
    let mut cmesh = CMesh::new();
    let t0 = cmesh.add_tree(Eclass::Quad);
    let t1 = cmesh.add_tree(Eclass::Quad);
    cmesh.set_join(t0, 1, t1, 0);
    cmesh.commit();
    cmesh
}

/// Run one ghost round: `size` rank-threads each build their forest via
/// `make_forest`, run `make_search` over a LocalComm, and hand back the
/// forest for inspection.
fn ghost_round<F, S>(size: usize, make_forest: F, make_search: S) -> Vec<QuadForest>
where
    F: Fn(usize) -> QuadForest + Send + Sync + 'static,
    S: Fn() -> GhostSearch<2> + Send + Sync + 'static,
{
    let make_forest = Arc::new(make_forest);
    let make_search = Arc::new(make_search);
    let handles: Vec<_> = (0..size)
        .map(|rank| {
            let make_forest = Arc::clone(&make_forest);
            let make_search = Arc::clone(&make_search);
            thread::spawn(move || {
                let mut forest = make_forest(rank);
                let comm = LocalComm::new(rank, size);
                make_search().do_ghost(&mut forest, &comm);
                forest
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn assert_symmetric(forests: &[QuadForest]) {
    for (a, forest_a) in forests.iter().enumerate() {
        let layer_a = forest_a.ghost().unwrap();
        for (b, forest_b) in forests.iter().enumerate() {
            if a == b {
                continue;
            }
            let layer_b = forest_b.ghost().unwrap();
            // What a receives from b is exactly what b mirrors to a.
            assert_eq!(layer_a.ghosts_from(b), layer_b.remotes_to(a));
        }
    }
}

#[test]
#[serial]
fn uniform_two_ranks_single_tree() {
    let forests = ghost_round(
        2,
        |rank| QuadForest::new_uniform(single_quad_cmesh(), 2, rank, 2),
        GhostSearch::new,
    );
    assert_symmetric(&forests);

    // Level 2, split in half along the space-filling curve: rank 0 owns the
    // lower half (y in {0, 1}), rank 1 the upper. The partition boundary is
    // one row of 4 cells on each side.
    let layer0 = forests[0].ghost().unwrap();
    let layer1 = forests[1].ghost().unwrap();
    assert_eq!(layer0.neighbor_ranks(), vec![1]);
    assert_eq!(layer1.neighbor_ranks(), vec![0]);
    assert_eq!(layer0.num_ghost_elements(), 4);
    assert_eq!(layer0.num_remote_elements(), 4);
    assert_eq!(layer1.num_ghost_elements(), 4);

    for (_, element) in layer0.iter_ghosts() {
        assert_eq!(element.cell.coords[1], 2);
    }
    for (_, element) in layer0.iter_remotes() {
        assert_eq!(element.cell.coords[1], 1);
    }
}

#[test]
#[serial]
fn three_ranks_remain_symmetric() {
    let forests = ghost_round(
        3,
        |rank| QuadForest::new_uniform(single_quad_cmesh(), 2, rank, 3),
        GhostSearch::new,
    );
    assert_symmetric(&forests);
    for forest in &forests {
        assert!(forest.ghost().unwrap().num_ghost_elements() > 0);
    }
}

#[test]
#[serial]
fn all_algorithm_versions_produce_equal_layers() {
    let searches: Vec<(&str, fn() -> GhostSearch<2>)> = vec![
        ("search", GhostSearch::new),
        ("face-v1", || GhostSearch::face(1)),
        ("face-v2", || GhostSearch::face(2)),
        ("face-v3", || GhostSearch::face(3)),
    ];
    let mut reference: Option<Vec<GhostLayer<2>>> = None;
    for (name, make_search) in searches {
        let forests = ghost_round(
            3,
            |rank| QuadForest::new_uniform(single_quad_cmesh(), 2, rank, 3),
            make_search,
        );
        let layers: Vec<GhostLayer<2>> =
            forests.iter().map(|f| f.ghost().unwrap().clone()).collect();
        match &reference {
            None => reference = Some(layers),
            Some(expected) => {
                assert_eq!(&layers, expected, "algorithm {name} diverged");
            }
        }
    }
}

#[test]
#[serial]
fn user_defined_query_matches_default() {
    let forests = ghost_round(
        2,
        |rank| QuadForest::new_uniform(single_quad_cmesh(), 2, rank, 2),
        GhostSearch::new,
    );
    // An always-true query descends everywhere and must find the same layer.
    let exhaustive = ghost_round(
        2,
        |rank| QuadForest::new_uniform(single_quad_cmesh(), 2, rank, 2),
        || GhostSearch::with_query(Arc::new(|_, _, _, _| true)),
    );
    for (a, b) in forests.iter().zip(&exhaustive) {
        assert_eq!(a.ghost().unwrap(), b.ghost().unwrap());
    }
}

#[test]
#[serial]
fn cross_tree_ghosts_through_join() {
    // Two joined quad trees at level 1, one tree per rank: the ghosts are
    // exactly the two cells on each side of the joined face.
    let forests = ghost_round(
        2,
        |rank| QuadForest::new_uniform(joined_quad_cmesh(), 1, rank, 2),
        GhostSearch::new,
    );
    assert_symmetric(&forests);

    let layer0 = forests[0].ghost().unwrap();
    let ghosts: Vec<_> = layer0.ghosts_from(1).to_vec();
    assert_eq!(
        ghosts,
        vec![
            GhostElement::new(1, TreeCell { level: 1, coords: [0, 0] }),
            GhostElement::new(1, TreeCell { level: 1, coords: [0, 1] }),
        ]
    );
    let remotes: Vec<_> = layer0.remotes_to(1).to_vec();
    assert_eq!(
        remotes,
        vec![
            GhostElement::new(0, TreeCell { level: 1, coords: [1, 0] }),
            GhostElement::new(0, TreeCell { level: 1, coords: [1, 1] }),
        ]
    );
}

#[test]
#[serial]
fn refined_forest_ghosts_follow_the_finer_leaves() {
    // Refine every leaf once on both ranks; the partition markers are
    // unchanged, the boundary row just doubles in resolution.
    let forests = ghost_round(
        2,
        |rank| {
            let mut forest = QuadForest::new_uniform(single_quad_cmesh(), 1, rank, 2);
            forest.refine(|_, _| true);
            forest
        },
        GhostSearch::new,
    );
    assert_symmetric(&forests);
    let layer0 = forests[0].ghost().unwrap();
    assert_eq!(layer0.num_ghost_elements(), 4);
    assert_eq!(layer0.num_remote_elements(), 4);
    for (_, element) in layer0.iter_ghosts() {
        assert_eq!(element.cell.level, 2);
        assert_eq!(element.cell.coords[1], 2);
    }
}

#[test]
#[should_panic(expected = "does not match communicator")]
fn mismatched_communicator_panics() {
    let mut forest = QuadForest::new_uniform(single_quad_cmesh(), 1, 0, 2);
    GhostSearch::new().do_ghost(&mut forest, &NoComm);
}

#[test]
fn ghost_layers_are_deterministic() {
    // Two serial runs of the same discovery must produce identical layers.
    let mut first = QuadForest::new_uniform(single_quad_cmesh(), 2, 0, 1);
    GhostSearch::new().do_ghost(&mut first, &NoComm);
    let mut second = QuadForest::new_uniform(single_quad_cmesh(), 2, 0, 1);
    GhostSearch::new().do_ghost(&mut second, &NoComm);
    assert_eq!(first.ghost().unwrap(), second.ghost().unwrap());
}
