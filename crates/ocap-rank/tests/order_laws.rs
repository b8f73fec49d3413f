//! Rank order laws
//!
//! Rank order must be a total preorder over every passable:
//! - reflexive and antisymmetric in sign
//! - transitive over any sorted triple
//! - sorting is stable and idempotent
//! - full order only refines rank order

#![allow(clippy::disallowed_methods)]

use std::cmp::Ordering;

use ocap_core::{same_value_zero, Value};
use ocap_rank::{
    assert_rank_sorted, compare_anti_rank, compare_rank, is_rank_sorted, sort_by_rank,
    FullOrderComparator, RankCompare, RankComparator,
};
use ocap_testkit::rank_sample;
use ocap_testkit::strategies::arb_passable;
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_compare_rank_is_reflexive(x in arb_passable()) {
        prop_assert_eq!(compare_rank(&x, &x).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_compare_rank_is_antisymmetric(a in arb_passable(), b in arb_passable()) {
        let ab = compare_rank(&a, &b).unwrap();
        let ba = compare_rank(&b, &a).unwrap();
        prop_assert_eq!(ab, ba.reverse());
        prop_assert_eq!(compare_anti_rank(&a, &b).unwrap(), ba);
    }

    #[test]
    fn test_compare_rank_is_transitive(
        triple in prop::collection::vec(arb_passable(), 3)
    ) {
        let sorted = sort_by_rank(triple, &RankComparator::new()).unwrap();
        let (a, b, c) = (&sorted[0], &sorted[1], &sorted[2]);
        prop_assert_ne!(compare_rank(a, b).unwrap(), Ordering::Greater);
        prop_assert_ne!(compare_rank(b, c).unwrap(), Ordering::Greater);
        prop_assert_ne!(compare_rank(a, c).unwrap(), Ordering::Greater);
        prop_assert_ne!(compare_rank(c, a).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_sort_by_rank_is_idempotent(xs in prop::collection::vec(arb_passable(), 0..8)) {
        let compare = RankComparator::new();
        let once = sort_by_rank(xs, &compare).unwrap();
        prop_assert!(is_rank_sorted(&once, &compare).unwrap());
        let twice = sort_by_rank(once.clone(), &compare).unwrap();
        prop_assert!(once.iter().zip(&twice).all(|(a, b)| same_value_zero(a, b)));
    }

    #[test]
    fn test_full_order_agrees_where_rank_decides(
        a in arb_passable(),
        b in arb_passable(),
        b_seen_first in any::<bool>(),
    ) {
        let full = FullOrderComparator::new();
        let (refined, reversed) = if b_seen_first {
            let reversed = full.compare(&b, &a).unwrap();
            (full.compare(&a, &b).unwrap(), reversed)
        } else {
            let refined = full.compare(&a, &b).unwrap();
            (refined, full.compare(&b, &a).unwrap())
        };
        let rank = compare_rank(&a, &b).unwrap();
        if rank != Ordering::Equal {
            prop_assert_eq!(refined, rank);
        }
        prop_assert_eq!(reversed, refined.reverse());
    }
}

#[test]
fn test_rank_sample_sorts_stably() {
    let sample = rank_sample();
    let compare = RankComparator::new();
    assert_rank_sorted(&sample.sorted, &compare).unwrap();
    assert!(!is_rank_sorted(&sample.unsorted, &compare).unwrap());

    let sorted = sort_by_rank(sample.unsorted, &compare).unwrap();
    assert_eq!(
        compare_rank(&Value::array(sorted.clone()), &Value::array(sample.sorted.clone())).unwrap(),
        Ordering::Equal
    );

    // tied remotables keep their input order: bob was listed before alice
    let remotables: Vec<&Value> = sorted
        .iter()
        .filter(|v| v.as_object().and_then(|o| o.marker()).is_some_and(|m| m.style == "remotable"))
        .collect();
    assert_eq!(remotables.len(), 3);
    assert!(remotables.iter().zip(&sample.sorted[30..33]).all(|(a, b)| *a == b));
}

#[test]
fn test_anti_rank_reverses_the_sample() {
    let sample = rank_sample();
    let anti = RankComparator::new().anti();
    let reversed = sort_by_rank(sample.unsorted, &anti).unwrap();
    assert!(is_rank_sorted(&reversed, &anti).unwrap());
    assert_eq!(reversed.first(), Some(&Value::Undefined));
}
