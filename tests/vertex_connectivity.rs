use forest_mesh::prelude::*;
use rand::SeedableRng;
use rand::seq::SliceRandom;

fn ids(raw: &[u64]) -> Vec<GlobalVertexId> {
    raw.iter().copied().map(GlobalVertexId::new).collect()
}

/// Two triangles sharing the edge (11, 12).
fn two_triangle_cmesh() -> CMesh {
    let mut cmesh = CMesh::new();
    let t0 = cmesh.add_tree(Eclass::Triangle);
    let t1 = cmesh.add_tree(Eclass::Triangle);
    cmesh.set_global_vertices_of_tree(t0, &ids(&[10, 11, 12]));
    cmesh.set_global_vertices_of_tree(t1, &ids(&[11, 12, 13]));
    cmesh.commit();
    cmesh
}

#[test]
fn two_triangles_sharing_an_edge() {
    let cmesh = two_triangle_cmesh();

    assert_eq!(cmesh.get_num_global_vertices(), 4);
    assert_eq!(cmesh.get_num_local_vertices(), 4);

    // The shared edge vertices list both triangles, tree 0 first.
    let list = cmesh.get_vertex_to_tree_list(GlobalVertexId::new(11));
    assert_eq!(list, &[TreeVertexPair::new(0, 1), TreeVertexPair::new(1, 0)]);
    let list = cmesh.get_vertex_to_tree_list(GlobalVertexId::new(12));
    assert_eq!(list, &[TreeVertexPair::new(0, 2), TreeVertexPair::new(1, 1)]);

    // The outer vertices belong to one triangle each.
    assert_eq!(cmesh.get_num_trees_at_vertex(GlobalVertexId::new(10)), 1);
    assert_eq!(cmesh.get_num_trees_at_vertex(GlobalVertexId::new(13)), 1);

    // Per-tree lookups reproduce the assignment.
    assert_eq!(cmesh.get_global_vertices_of_tree(1, 3), &ids(&[11, 12, 13])[..]);
    assert_eq!(
        cmesh.get_global_vertex_of_tree(0, 1, 3),
        GlobalVertexId::new(11)
    );
}

#[test]
fn degenerate_quad_counts_every_corner() {
    let mut cmesh = CMesh::new();
    let t0 = cmesh.add_tree(Eclass::Quad);
    cmesh.set_global_vertices_of_tree(t0, &ids(&[7, 7, 7, 7]));
    cmesh.commit();

    assert_eq!(cmesh.get_num_global_vertices(), 1);
    assert_eq!(cmesh.get_num_trees_at_vertex(GlobalVertexId::new(7)), 4);
    assert_eq!(
        cmesh.get_vertex_to_tree_list(GlobalVertexId::new(7)),
        &[
            TreeVertexPair::new(0, 0),
            TreeVertexPair::new(0, 1),
            TreeVertexPair::new(0, 2),
            TreeVertexPair::new(0, 3),
        ]
    );
}

#[test]
fn mixed_element_classes() {
    let mut cmesh = CMesh::new();
    let tri = cmesh.add_tree(Eclass::Triangle);
    let quad = cmesh.add_tree(Eclass::Quad);
    cmesh.set_global_vertices_of_tree(tri, &ids(&[0, 1, 2]));
    cmesh.set_global_vertices_of_tree(quad, &ids(&[1, 2, 3, 4]));
    cmesh.commit();

    assert_eq!(cmesh.get_num_global_vertices(), 5);
    assert_eq!(
        cmesh.get_vertex_to_tree_list(GlobalVertexId::new(2)),
        &[TreeVertexPair::new(0, 2), TreeVertexPair::new(1, 1)]
    );
}

#[test]
fn completeness_over_all_buckets() {
    let cmesh = two_triangle_cmesh();
    let vtt = cmesh.vertex_connectivity().vertex_to_tree();

    // Every (tree, corner) pair appears in exactly one bucket: the total
    // number of stored pairs equals the sum of per-tree corner counts, and
    // the pair set has no duplicates.
    let total_corners: usize = (0..cmesh.num_local_trees())
        .map(|tree| cmesh.tree_class(tree).num_vertices())
        .sum();
    let mut pairs: Vec<TreeVertexPair> = vtt.iter().flat_map(|(_, list)| list.to_vec()).collect();
    assert_eq!(pairs.len(), total_corners);
    pairs.sort_unstable();
    pairs.dedup();
    assert_eq!(pairs.len(), total_corners);
}

#[test]
fn vertex_to_tree_roundtrips_to_tree_to_vertex() {
    let cmesh = two_triangle_cmesh();
    let conn = cmesh.vertex_connectivity();

    // Re-derive every tree's vertex ids from the inverted map; the result
    // must reproduce the original assignment exactly.
    let num_trees = cmesh.num_local_trees();
    let mut rebuilt: Vec<Vec<Option<GlobalVertexId>>> = (0..num_trees)
        .map(|tree| vec![None; cmesh.tree_class(tree).num_vertices()])
        .collect();
    for (vertex, list) in conn.vertex_to_tree().iter() {
        for pair in list {
            assert!(rebuilt[pair.tree][pair.corner].is_none());
            rebuilt[pair.tree][pair.corner] = Some(vertex);
        }
    }
    for tree in 0..num_trees {
        let num_corners = cmesh.tree_class(tree).num_vertices();
        let expected = conn.get_global_vertices_of_tree(tree, num_corners);
        let actual: Vec<GlobalVertexId> =
            rebuilt[tree].iter().map(|slot| slot.unwrap()).collect();
        assert_eq!(actual, expected);
    }
}

#[test]
fn identical_builds_are_equal() {
    let a = two_triangle_cmesh();
    let b = two_triangle_cmesh();
    assert_eq!(a.vertex_connectivity(), b.vertex_connectivity());
    assert_eq!(
        a.vertex_connectivity().vertex_to_tree(),
        b.vertex_connectivity().vertex_to_tree()
    );
}

#[test]
fn insertion_order_does_not_matter() {
    // Shuffle the (vertex, tree, corner) insertions; commit must converge to
    // the same canonical map regardless of order.
    let mut layout = TreeLayout::new();
    layout.push_local(Eclass::Quad);
    layout.push_local(Eclass::Quad);
    let entries: Vec<(u64, usize, usize)> = vec![
        (0, 0, 0),
        (1, 0, 1),
        (2, 0, 2),
        (3, 0, 3),
        (1, 1, 0),
        (3, 1, 1),
        (4, 1, 2),
        (5, 1, 3),
    ];

    let build = |order: &[(u64, usize, usize)]| {
        let mut vtt = VertexToTree::new();
        for &(vertex, tree, corner) in order {
            vtt.add_vertex_to_tree(&layout, GlobalVertexId::new(vertex), tree, corner);
        }
        vtt.commit(&layout);
        vtt
    };

    let reference = build(&entries);
    let mut rng = rand::rngs::SmallRng::seed_from_u64(0xF0_4E57);
    for _ in 0..8 {
        let mut shuffled = entries.clone();
        shuffled.shuffle(&mut rng);
        assert_eq!(build(&shuffled), reference);
    }
}

#[test]
fn sort_invariant_after_commit() {
    let cmesh = two_triangle_cmesh();
    for (_, list) in cmesh.vertex_connectivity().vertex_to_tree().iter() {
        assert!(list.windows(2).all(|w| w[0] <= w[1]));
        assert!(!list.is_empty());
    }
    cmesh
        .vertex_connectivity()
        .vertex_to_tree()
        .validate_invariants()
        .unwrap();
}

#[test]
#[should_panic(expected = "does not exist")]
fn missing_vertex_lookup_aborts() {
    let cmesh = two_triangle_cmesh();
    let _ = cmesh.get_vertex_to_tree_list(GlobalVertexId::new(999));
}

#[test]
#[should_panic(expected = "incomplete")]
fn partial_vertex_assignment_aborts_at_commit() {
    // Tree 1 never registers vertex ids: the completeness sweep at commit
    // must fail, not the first query.
    let mut layout = TreeLayout::new();
    layout.push_local(Eclass::Triangle);
    layout.push_local(Eclass::Triangle);
    let mut vtt = VertexToTree::new();
    for corner in 0..3 {
        vtt.add_vertex_to_tree(&layout, GlobalVertexId::new(corner as u64), 0, corner);
    }
    vtt.commit(&layout);
}
