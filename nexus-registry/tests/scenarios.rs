use nexus_registry::{Compaction, Registry, RegistryBuilder, RegistryError};

fn registry() -> Registry<u32, u32, &'static str> {
    Registry::new()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn higher_priority_served_first() {
    let mut reg = registry();
    reg.add(1, 5, "a").unwrap();
    reg.add(2, 9, "b").unwrap();

    assert_eq!(reg.exec_top().map(|t| t.key), Ok(2));
}

#[test]
fn edit_raises_key_above_later_add() {
    let mut reg = registry();
    reg.add(1, 5, "a").unwrap();
    reg.edit_priority(&1, 20).unwrap();
    reg.add(2, 9, "b").unwrap();

    assert_eq!(reg.exec_top().map(|t| t.key), Ok(1));
}

#[test]
fn removed_key_never_served() {
    let mut reg = registry();
    reg.add(1, 5, "a").unwrap();
    reg.remove(&1).unwrap();

    assert_eq!(reg.exec_top(), Err(RegistryError::NoEntries));
}

#[test]
fn tie_goes_to_earlier_insertion() {
    let mut reg = registry();
    reg.add(1, 5, "a").unwrap();
    reg.add(2, 5, "b").unwrap();

    assert_eq!(reg.exec_top().map(|t| t.key), Ok(1));
    assert_eq!(reg.exec_top().map(|t| t.key), Ok(2));
}

#[test]
fn exec_consumes() {
    let mut reg = registry();
    reg.add(1, 5, "a").unwrap();

    assert_eq!(reg.exec_top().map(|t| t.key), Ok(1));
    assert_eq!(reg.exec_top(), Err(RegistryError::NoEntries));
}

// =============================================================================
// Consumed keys
// =============================================================================

#[test]
fn consumed_key_is_not_found() {
    let mut reg = registry();
    reg.add(1, 5, "a").unwrap();
    reg.exec_top().unwrap();

    assert_eq!(reg.get(&1).map(|_| ()), Err(RegistryError::NotFound));
    assert_eq!(reg.edit_priority(&1, 3), Err(RegistryError::NotFound));
    assert_eq!(reg.remove(&1), Err(RegistryError::NotFound));
}

#[test]
fn consumed_key_can_be_added_again() {
    let mut reg = registry();
    reg.add(1, 50, "first").unwrap();
    reg.add(2, 10, "other").unwrap();
    reg.exec_top().unwrap();

    reg.add(1, 1, "second").unwrap();
    let top = reg.exec_top().unwrap();
    assert_eq!(top.key, 2);
    let top = reg.exec_top().unwrap();
    assert_eq!((top.key, top.priority, top.attributes), (1, 1, "second"));
}

#[test]
fn tie_keeps_rank_across_edits() {
    let mut reg = registry();
    reg.add(1, 5, "a").unwrap();
    reg.add(2, 5, "b").unwrap();
    reg.edit_priority(&1, 4).unwrap();
    reg.edit_priority(&1, 5).unwrap();

    // key 1 was added first; edits do not move it behind key 2
    assert_eq!(reg.exec_top().map(|t| t.key), Ok(1));
}

#[test]
fn readd_after_remove_ranks_as_new() {
    let mut reg = registry();
    reg.add(1, 5, "a").unwrap();
    reg.add(2, 5, "b").unwrap();
    reg.remove(&1).unwrap();
    reg.add(1, 5, "a").unwrap();

    assert_eq!(reg.exec_top().map(|t| t.key), Ok(2));
    assert_eq!(reg.exec_top().map(|t| t.key), Ok(1));
}

// =============================================================================
// Staleness
// =============================================================================

#[test]
fn many_edits_serve_once() {
    let mut reg: Registry<u32, u32, ()> = RegistryBuilder::default()
        .compaction(Compaction::Disabled)
        .build()
        .unwrap();

    reg.add(7, 0, ()).unwrap();
    for p in 1..=100 {
        reg.edit_priority(&7, p).unwrap();
    }
    assert_eq!(reg.stats().stale, 100);

    assert_eq!(reg.exec_top().map(|t| (t.key, t.priority)), Ok((7, 100)));
    assert_eq!(reg.exec_top(), Err(RegistryError::NoEntries));
    assert_eq!(reg.stats().queued, 0);
}

#[test]
fn lowered_priority_is_honored() {
    let mut reg = registry();
    reg.add(1, 100, "a").unwrap();
    reg.add(2, 50, "b").unwrap();
    reg.edit_priority(&1, 10).unwrap();

    assert_eq!(reg.exec_top().map(|t| t.key), Ok(2));
    assert_eq!(reg.exec_top().map(|t| (t.key, t.priority)), Ok((1, 10)));
}

#[test]
fn peek_then_exec_agree() {
    let mut reg = registry();
    for (key, priority) in [(1, 3), (2, 8), (3, 8), (4, 1)] {
        reg.add(key, priority, "x").unwrap();
    }
    reg.remove(&2).unwrap();

    while let Ok(peeked) = reg.peek_top().map(|t| *t.key) {
        assert_eq!(reg.exec_top().map(|t| t.key), Ok(peeked));
    }
    assert!(reg.is_empty());
}

#[test]
fn string_keys_and_payloads() {
    let mut reg: Registry<String, i64, Vec<u8>> = Registry::new();
    reg.add("alpha".to_string(), -3, vec![1]).unwrap();
    reg.add("beta".to_string(), 7, vec![2]).unwrap();
    reg.edit(&"alpha".to_string(), 8, vec![3, 3]).unwrap();

    let top = reg.exec_top().unwrap();
    assert_eq!(top.key, "alpha");
    assert_eq!(top.attributes, vec![3, 3]);
}

// =============================================================================
// Steady-state churn
// =============================================================================

#[test]
fn churn_with_readd_keeps_live_set_steady() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const KEYS: u32 = 500;

    let mut reg: Registry<u32, u32, u32> = Registry::new();
    for key in 0..KEYS {
        reg.add(key, key, key).unwrap();
    }

    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20_000 {
        if rng.gen_ratio(9, 10) {
            let key = rng.gen_range(0..KEYS);
            assert_eq!(reg.edit_priority(&key, rng.gen_range(0..1_000)), Ok(()));
        } else {
            let top = reg.exec_top().unwrap();
            reg.add(top.key, rng.gen_range(0..1_000), top.attributes)
                .unwrap();
        }
        assert_eq!(reg.len(), KEYS as usize);
    }
}
