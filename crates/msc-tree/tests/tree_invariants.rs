use msc_core::{NodeId, TimeTree};
use msc_tree::{
    canonical_hash, check_heights, newick, tree_from_json, tree_to_json, trees_from_json,
    trees_to_json, HeightSnapshot, TreeBuilder, TreeImpl,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random coalescent-style tree: repeatedly joins two random lineages above
/// the current oldest height.
fn random_tree(leaves: usize, seed: u64) -> TreeImpl {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = TreeBuilder::new();
    let mut lineages: Vec<NodeId> = (0..leaves)
        .map(|i| builder.leaf(format!("t{i}"), rng.gen_range(0.0..0.5)))
        .collect();
    let mut height = 0.5;
    while lineages.len() > 1 {
        let a = lineages.swap_remove(rng.gen_range(0..lineages.len()));
        let b = lineages.swap_remove(rng.gen_range(0..lineages.len()));
        height += rng.gen_range(0.0..1.0);
        lineages.push(builder.join(a, b, height).unwrap());
    }
    builder.build().unwrap()
}

#[test]
fn validation_reports_height_order() {
    let mut tree = newick::parse("((a:1,b:1):1,c:2);").unwrap();
    let a = tree.find_leaf("a").unwrap();
    let ab = tree.parent(a).unwrap();
    tree.set_height(a, tree.height(ab) + 0.1);
    let err = check_heights(&tree).unwrap_err();
    assert_eq!(err.info().code, "height-order");
    assert_eq!(err.info().context["node"], ab.to_string());
}

#[test]
fn validation_rejects_negative_heights() {
    let mut tree = newick::parse("(a:1,b:1);").unwrap();
    let a = tree.find_leaf("a").unwrap();
    tree.set_height(a, -0.5);
    assert_eq!(check_heights(&tree).unwrap_err().info().code, "invalid-height");
}

#[test]
fn equal_heights_are_valid() {
    let tree = newick::parse("((a:0,b:0):0,c:0);").unwrap();
    check_heights(&tree).unwrap();
}

#[test]
fn snapshot_restores_every_height() {
    let mut tree = random_tree(8, 3);
    let before = HeightSnapshot::capture(&tree);
    let hash = canonical_hash(&tree);
    let nodes: Vec<_> = tree.nodes().collect();
    for node in nodes {
        let height = tree.height(node);
        tree.set_height(node, height + 1.0);
    }
    assert_ne!(canonical_hash(&tree), hash);
    before.restore(&mut tree).unwrap();
    assert_eq!(canonical_hash(&tree), hash);
}

#[test]
fn snapshot_refuses_foreign_tree() {
    let small = newick::parse("(a:1,b:1);").unwrap();
    let mut large = newick::parse("((a:1,b:1):1,c:2);").unwrap();
    let err = HeightSnapshot::capture(&small)
        .restore(&mut large)
        .unwrap_err();
    assert_eq!(err.info().code, "snapshot-mismatch");
}

#[test]
fn hash_distinguishes_heights_and_labels() {
    let a = newick::parse("((a:1,b:1):1,c:2);").unwrap();
    let b = newick::parse("((a:1,b:1):1.5,c:2.5);").unwrap();
    let c = newick::parse("((a:1,c:1):1,b:2);").unwrap();
    assert_ne!(canonical_hash(&a), canonical_hash(&b));
    assert_ne!(canonical_hash(&a), canonical_hash(&c));
    assert_eq!(canonical_hash(&a), canonical_hash(&a.clone()));
}

#[test]
fn json_rejects_cycles() {
    let json = r#"{"nodes":[
        {"label":"a","height":0.0},
        {"label":"b","height":0.0},
        {"height":1.0,"children":[0,1]},
        {"height":2.0,"children":[4,2]},
        {"height":2.0,"children":[3,2]}
    ]}"#;
    let err = tree_from_json(json).unwrap_err();
    assert_eq!(err.info().code, "multiple-parents");
}

#[test]
fn json_tree_lists_keep_order() {
    let trees = newick::parse_many("((a:1,b:1):1,c:2);\n(a:3,c:3);\n").unwrap();
    let restored = trees_from_json(&trees_to_json(&trees).unwrap()).unwrap();
    assert_eq!(restored, trees);
}

#[test]
fn json_tree_list_errors_name_the_tree() {
    let json = r#"[
        {"nodes":[{"label":"a","height":0.0},{"label":"b","height":0.0},{"height":1.0,"children":[0,1]}]},
        {"nodes":[{"label":"a","height":2.0},{"label":"b","height":0.0},{"height":1.0,"children":[0,1]}]}
    ]"#;
    let err = trees_from_json(json).unwrap_err();
    assert_eq!(err.info().code, "height-order");
    assert_eq!(err.info().context.get("tree_index").map(String::as_str), Some("1"));
}

proptest! {
    #[test]
    fn random_trees_validate_and_round_trip(seed in any::<u64>(), leaves in 2usize..24) {
        let tree = random_tree(leaves, seed);
        prop_assert!(check_heights(&tree).is_ok());
        prop_assert_eq!(tree.leaf_count(), leaves);
        prop_assert_eq!(tree.node_count(), 2 * leaves - 1);

        let restored = tree_from_json(&tree_to_json(&tree).unwrap()).unwrap();
        prop_assert_eq!(canonical_hash(&restored), canonical_hash(&tree));

        let reparsed = newick::parse(&newick::write(&tree)).unwrap();
        prop_assert_eq!(reparsed.leaf_count(), leaves);
        prop_assert!(check_heights(&reparsed).is_ok());
    }
}
