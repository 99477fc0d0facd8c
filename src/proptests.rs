use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

/// Checks the structural invariants: no vacant node below the root, and a
/// live count matching the reachable entries.
fn validate_tree<V>(reg: &Registrie<V>) {
    fn walk<V>(node: &Node<V>, depth: usize, entries: &mut usize) {
        if depth > 0 {
            assert!(!node.is_vacant(), "vacant node left at depth {depth}");
        }
        if node.slot.is_some() {
            *entries += 1;
        }
        for child in node.children.values() {
            walk(child, depth + 1, entries);
        }
    }

    let mut entries = 0usize;
    walk(&reg.root, 0, &mut entries);
    assert_eq!(entries, reg.len(), "reachable entries must match Registrie::len");
}

// A tiny alphabet (delimiter included) so keys share prefixes often.
fn key_strategy() -> impl Strategy<Value = String> + Clone {
    "[ab é]{0,6}"
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 50)]
    Register(#[proptest(strategy = "key_strategy()")] String, u64),
    #[proptest(weight = 20)]
    Erase(#[proptest(strategy = "key_strategy()")] String),
    #[proptest(weight = 5)]
    ErasePrefix(#[proptest(strategy = "key_strategy()")] String),
    #[proptest(weight = 15)]
    Query(#[proptest(strategy = "key_strategy()")] String),
    #[proptest(weight = 10)]
    Candidate(#[proptest(strategy = "key_strategy()")] String),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_u64(ops in prop::collection::vec(any::<Op>(), 0..=500)) {
        let mut reg: Registrie<u64> = Registrie::new();
        let mut m: BTreeMap<String, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Register(key, value) => {
                    let old_reg = reg.register(&key, value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_reg, old_m);
                }
                Op::Erase(key) => {
                    prop_assert_eq!(reg.erase(&key), m.remove(&key));
                }
                Op::ErasePrefix(prefix) => {
                    let before = m.len();
                    m.retain(|k, _| !k.starts_with(&prefix));
                    prop_assert_eq!(reg.erase_prefix(&prefix), before - m.len());
                }
                Op::Query(key) => {
                    prop_assert_eq!(reg.query(&key).copied(), m.get(&key).copied());
                }
                Op::Candidate(prefix) => {
                    let expected: Vec<String> =
                        m.keys().filter(|k| k.starts_with(&prefix)).cloned().collect();
                    prop_assert_eq!(reg.candidate(&prefix), expected);
                }
            }

            prop_assert_eq!(reg.len(), m.len());
        }

        validate_tree(&reg);
        let got: Vec<(String, u64)> = reg.iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(String, u64)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_candidate_extends_prefix(
        keys in prop::collection::btree_set(key_strategy(), 0..=40),
        prefix in key_strategy(),
    ) {
        let reg: Registrie<()> = keys.iter().map(|k| (k, ())).collect();
        let got = reg.candidate(&prefix);

        prop_assert!(got.windows(2).all(|w| w[0] < w[1]), "candidates must be sorted and unique");
        prop_assert!(got.iter().all(|k| k.starts_with(&prefix) && keys.contains(k)));
        prop_assert_eq!(got.len(), keys.iter().filter(|k| k.starts_with(&prefix)).count());
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

const SMALL_SET: [&str; 6] = ["", "a", "ab", "a b", "b", "ba"];

#[test]
fn exhaustive_register_order_small_set() {
    for_each_permutation(&SMALL_SET, |perm| {
        let mut reg: Registrie<u64> = Registrie::new();
        let mut m: BTreeMap<String, u64> = BTreeMap::new();

        for (i, key) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(reg.register(key, v), m.insert(key.to_string(), v));
        }

        validate_tree(&reg);
        let got: Vec<(String, u64)> = reg.iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(String, u64)> = m.into_iter().collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_erase_order_small_set() {
    // Register in a fixed order, then erase in all permutations.
    let base: Registrie<u64> = SMALL_SET
        .iter()
        .enumerate()
        .map(|(i, key)| (key, i as u64))
        .collect();

    for_each_permutation(&SMALL_SET, |perm| {
        let mut reg = base.clone();
        let mut remaining = SMALL_SET.len();

        for key in perm {
            assert!(reg.erase(key).is_some());
            remaining -= 1;
            assert_eq!(reg.len(), remaining);
            validate_tree(&reg);
        }
        assert!(reg.is_empty());
        assert!(reg.root.is_vacant());
    });
}
