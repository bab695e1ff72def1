use pwa_combin::{Equivalence, GroupingCache, GroupingHandle, ParticleIndex};

fn idx(raw: u8) -> ParticleIndex {
    ParticleIndex::from_raw(raw)
}

#[test]
fn leaves_intern_once() {
    let mut cache = GroupingCache::new();
    let first = cache.intern_final_state(idx(0));
    let second = cache.intern_final_state(idx(0));
    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);
    assert!(cache.grouping(first).unwrap().is_final_state());
    assert_eq!(cache.find_final_state(idx(0)), Some(first));
    assert_eq!(cache.find_final_state(idx(1)), None);
}

#[test]
fn composites_intern_once_with_lineage_daughters() {
    let mut cache = GroupingCache::new();
    let l0 = cache.intern_final_state(idx(0));
    let l1 = cache.intern_final_state(idx(1));
    let pair = cache.intern_composite(&[l0, l1]).unwrap();
    let again = cache.intern_composite(&[l0, l1]).unwrap();
    assert_eq!(pair, again);

    // Standalone leaves keep no parent; the composite holds its own copies.
    assert_eq!(cache.grouping(l0).unwrap().parent(), None);
    let daughters = cache.grouping(pair).unwrap().daughters().to_vec();
    assert_eq!(daughters.len(), 2);
    assert_ne!(daughters[0], l0);
    assert_ne!(daughters[1], l1);
    for (daughter, raw) in daughters.iter().zip([0u8, 1]) {
        let grouping = cache.grouping(*daughter).unwrap();
        assert_eq!(grouping.parent(), Some(pair));
        assert_eq!(grouping.indices(), [idx(raw)]);
    }

    // 2 standalone leaves, the composite and its 2 copies.
    assert_eq!(cache.len(), 5);
    assert!(cache.consistency_check().is_ok());
}

#[test]
fn intern_from_indices_builds_flat_composites() {
    let mut cache = GroupingCache::new();
    let single = cache.intern_from_indices(&[idx(2)]).unwrap();
    assert!(cache.grouping(single).unwrap().is_final_state());

    let triple = cache.intern_from_indices(&[idx(0), idx(1), idx(2)]).unwrap();
    let grouping = cache.grouping(triple).unwrap();
    assert_eq!(grouping.indices(), [idx(0), idx(1), idx(2)]);
    assert_eq!(grouping.daughters().len(), 3);
    assert!(cache.spans_final_state(triple, 3).unwrap());
    assert!(!cache.spans_final_state(triple, 4).unwrap());

    assert_eq!(cache.find_from_indices(&[idx(0), idx(1), idx(2)]), Some(triple));
    assert_eq!(cache.find_from_indices(&[idx(0), idx(3)]), None);
}

#[test]
fn nested_composites_share_structure() {
    let mut cache = GroupingCache::new();
    let pair = cache.intern_from_indices(&[idx(0), idx(1)]).unwrap();
    let l2 = cache.intern_final_state(idx(2));
    let root = cache.intern_composite(&[pair, l2]).unwrap();
    let again = cache.intern_composite(&[pair, l2]).unwrap();
    assert_eq!(root, again);
    assert_eq!(cache.format_grouping(root).unwrap(), "((0 1) 2)");

    // Every node under the root resolves back to it.
    let inner_pair = cache.grouping(root).unwrap().daughters()[0];
    let inner_leaf = cache.grouping(inner_pair).unwrap().daughters()[0];
    assert_eq!(cache.top(inner_leaf).unwrap(), root);
    assert_eq!(cache.top(root).unwrap(), root);
    assert!(cache.spans_final_state(root, 3).unwrap());
    assert!(cache.consistency_check().is_ok());
}

#[test]
fn ordering_distinguishes_handles_but_not_orderless_content() {
    let mut cache = GroupingCache::new();
    let forward = cache.intern_from_indices(&[idx(0), idx(1)]).unwrap();
    let reversed = cache.intern_from_indices(&[idx(1), idx(0)]).unwrap();
    assert_ne!(forward, reversed);

    let eval = |relation: Equivalence| relation.eval(&cache, forward, reversed).unwrap();
    assert!(!eval(Equivalence::ByHandle));
    assert!(!eval(Equivalence::ByOrderedContent));
    assert!(eval(Equivalence::ByOrderlessContent));
    assert!(!eval(Equivalence::DownTree));
    assert!(eval(Equivalence::DownByOrderlessContent));
}

#[test]
fn up_tree_relations_see_the_lineage() {
    let mut cache = GroupingCache::new();
    let pair = cache.intern_from_indices(&[idx(0), idx(1)]).unwrap();
    let l2 = cache.intern_final_state(idx(2));
    let root = cache.intern_composite(&[pair, l2]).unwrap();

    let inner_pair = cache.grouping(root).unwrap().daughters()[0];
    let standalone_zero = cache.find_final_state(idx(0)).unwrap();
    let zero_under_pair = cache.grouping(pair).unwrap().daughters()[0];
    let zero_under_root = cache.grouping(inner_pair).unwrap().daughters()[0];

    // Same content everywhere.
    for (a, b) in [
        (standalone_zero, zero_under_pair),
        (zero_under_pair, zero_under_root),
    ] {
        assert!(Equivalence::ByOrderedContent.eval(&cache, a, b).unwrap());
    }

    // The parent chains differ: none, a top-level pair, a pair inside the root.
    assert!(!Equivalence::UpTree
        .eval(&cache, standalone_zero, zero_under_pair)
        .unwrap());
    assert!(!Equivalence::UpTree
        .eval(&cache, zero_under_pair, zero_under_root)
        .unwrap());
    assert!(Equivalence::UpTree
        .eval(&cache, zero_under_root, zero_under_root)
        .unwrap());
    assert!(!Equivalence::UpAndDownTree
        .eval(&cache, pair, inner_pair)
        .unwrap());
    assert!(Equivalence::DownTree.eval(&cache, pair, inner_pair).unwrap());
}

#[test]
fn invalid_composites_are_rejected() {
    let mut cache = GroupingCache::new();
    let l0 = cache.intern_final_state(idx(0));
    let l1 = cache.intern_final_state(idx(1));
    let pair = cache.intern_composite(&[l0, l1]).unwrap();

    let empty = cache.intern_composite(&[]).unwrap_err();
    assert_eq!(empty.info().code, "empty-daughters");

    let overlap = cache.intern_composite(&[pair, l1]).unwrap_err();
    assert_eq!(overlap.info().code, "overlapping-daughters");

    let missing = GroupingHandle::from_raw(999);
    let unknown = cache.intern_composite(&[missing]).unwrap_err();
    assert_eq!(unknown.info().code, "unknown-grouping");
    assert_eq!(
        unknown.info().context.get("grouping").map(String::as_str),
        Some("999")
    );
}

#[test]
fn sweep_keeps_the_root_closure() {
    let mut cache = GroupingCache::new();
    let root = cache.intern_from_indices(&[idx(0), idx(1)]).unwrap();
    let stray_leaf = cache.intern_final_state(idx(3));
    let stray_pair = cache.intern_from_indices(&[idx(3), idx(4)]).unwrap();
    let standalone_zero = cache.find_final_state(idx(0)).unwrap();

    let inner = cache.grouping(root).unwrap().daughters().to_vec();
    let not_a_top = cache.sweep(&[inner[0]]).unwrap_err();
    assert_eq!(not_a_top.info().code, "sweep-root-not-top");

    let swept = cache.sweep(&[root]).unwrap();
    // The standalone leaves 0, 1, 3, 4 plus the stray pair and its 2 copies.
    assert_eq!(swept, 7);
    assert_eq!(cache.len(), 3);
    assert!(cache.grouping(root).is_ok());
    assert!(cache.grouping(inner[0]).is_ok());
    assert!(cache.grouping(stray_leaf).is_err());
    assert!(cache.grouping(stray_pair).is_err());
    assert!(cache.grouping(standalone_zero).is_err());
    assert!(cache.consistency_check().is_ok());

    // Interning after a sweep starts a fresh record.
    let fresh = cache.intern_final_state(idx(3));
    assert_ne!(fresh, stray_leaf);
    assert!(cache.grouping(fresh).is_ok());
}

#[test]
fn sweep_with_multiple_roots_keeps_each_closure() {
    let mut cache = GroupingCache::new();
    let root = cache.intern_from_indices(&[idx(0), idx(1), idx(2)]).unwrap();
    let kept_leaf = cache.intern_final_state(idx(5));
    cache.intern_final_state(idx(6));

    cache.sweep(&[root, kept_leaf]).unwrap();
    assert!(cache.grouping(kept_leaf).is_ok());
    assert!(cache.find_final_state(idx(6)).is_none());
    // Root, its 3 leaf copies and the kept standalone leaf.
    assert_eq!(cache.len(), 5);
}
