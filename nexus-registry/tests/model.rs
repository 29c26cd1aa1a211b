//! Randomized operation sequences checked against a linear-scan model.

use std::collections::HashMap;

use nexus_registry::{Compaction, Registry, RegistryBuilder, RegistryError};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Add(u8, u16),
    Edit(u8, u16),
    Remove(u8),
    Exec,
    Peek,
}

fn arb_op() -> impl Strategy<Value = Op> {
    // Small key space so edits and removals hit live keys often.
    prop_oneof![
        3 => (0u8..16, 0u16..32).prop_map(|(k, p)| Op::Add(k, p)),
        3 => (0u8..16, 0u16..32).prop_map(|(k, p)| Op::Edit(k, p)),
        1 => (0u8..16).prop_map(Op::Remove),
        2 => Just(Op::Exec),
        1 => Just(Op::Peek),
    ]
}

/// Reference: map of key -> (priority, insertion seq), served by linear scan.
#[derive(Default)]
struct Model {
    live: HashMap<u8, (u16, u64)>,
    next_seq: u64,
}

impl Model {
    fn add(&mut self, key: u8, priority: u16) -> Result<(), RegistryError> {
        if self.live.contains_key(&key) {
            return Err(RegistryError::DuplicateKey);
        }
        self.live.insert(key, (priority, self.next_seq));
        self.next_seq += 1;
        Ok(())
    }

    fn edit(&mut self, key: u8, priority: u16) -> Result<(), RegistryError> {
        let entry = self.live.get_mut(&key).ok_or(RegistryError::NotFound)?;
        entry.0 = priority;
        Ok(())
    }

    fn remove(&mut self, key: u8) -> Result<u16, RegistryError> {
        self.live
            .remove(&key)
            .map(|(p, _)| p)
            .ok_or(RegistryError::NotFound)
    }

    fn top(&self) -> Option<(u8, u16)> {
        self.live
            .iter()
            .min_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)))
            .map(|(&k, &(p, _))| (k, p))
    }

    fn exec(&mut self) -> Result<(u8, u16), RegistryError> {
        let (key, priority) = self.top().ok_or(RegistryError::NoEntries)?;
        self.live.remove(&key);
        Ok((key, priority))
    }
}

fn run(mut reg: Registry<u8, u16, u8>, ops: &[Op]) -> Result<(), TestCaseError> {
    let mut model = Model::default();

    for op in ops {
        match *op {
            Op::Add(k, p) => prop_assert_eq!(reg.add(k, p, k), model.add(k, p)),
            Op::Edit(k, p) => prop_assert_eq!(reg.edit_priority(&k, p), model.edit(k, p)),
            Op::Remove(k) => {
                prop_assert_eq!(reg.remove(&k).map(|(p, _)| p), model.remove(k))
            }
            Op::Exec => {
                let got = reg.exec_top().map(|t| {
                    assert_eq!(t.attributes, t.key);
                    (t.key, t.priority)
                });
                prop_assert_eq!(got, model.exec());
            }
            Op::Peek => {
                let got = reg.peek_top().map(|t| (*t.key, *t.priority)).ok();
                prop_assert_eq!(got, model.top());
            }
        }

        // live key set never depends on queue contents
        prop_assert_eq!(reg.len(), model.live.len());
        for key in model.live.keys() {
            prop_assert!(reg.contains(key));
        }
        let stats = reg.stats();
        prop_assert_eq!(stats.live + stats.stale, stats.queued);
    }

    // drain: every live key served exactly once, in model order
    loop {
        let expected = model.exec();
        prop_assert_eq!(reg.exec_top().map(|t| (t.key, t.priority)), expected);
        if expected.is_err() {
            break;
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn matches_model_without_compaction(ops in prop::collection::vec(arb_op(), 0..200)) {
        let reg = RegistryBuilder::default()
            .compaction(Compaction::Disabled)
            .build()
            .unwrap();
        run(reg, &ops)?;
    }

    #[test]
    fn matches_model_with_eager_compaction(ops in prop::collection::vec(arb_op(), 0..200)) {
        let reg = RegistryBuilder::default()
            .compaction(Compaction::Ratio { min_entries: 1, max_stale_ratio: 0.1 })
            .build()
            .unwrap();
        run(reg, &ops)?;
    }
}
