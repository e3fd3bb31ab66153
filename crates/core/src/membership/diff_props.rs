//! Property-based tests for membership diffs.
//!
//! - Adds plus unchanged is exactly the desired set
//! - Removes plus unchanged is exactly the current set
//! - The three parts never overlap

use std::collections::BTreeSet;

use proptest::prelude::*;

use ledgerform_shared::types::{AccountId, AccountSetId};

use super::diff::MembershipDiff;
use super::edge::MemberRef;

fn member() -> impl Strategy<Value = MemberRef> {
    prop_oneof![
        (0u8..8).prop_map(|n| MemberRef::Account(AccountId::new(format!("acc-{n}")).unwrap())),
        (0u8..4).prop_map(|n| MemberRef::AccountSet(AccountSetId::new(format!("as-{n}")).unwrap())),
    ]
}

fn members() -> impl Strategy<Value = Vec<MemberRef>> {
    prop::collection::vec(member(), 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_diff_partitions_both_sides(desired in members(), current in members()) {
        let diff = MembershipDiff::compute(&desired, &current);
        let desired: BTreeSet<_> = desired.into_iter().collect();
        let current: BTreeSet<_> = current.into_iter().collect();

        let reached: BTreeSet<_> = diff.to_add.union(&diff.unchanged).cloned().collect();
        prop_assert_eq!(&reached, &desired);

        let before: BTreeSet<_> = diff.to_remove.union(&diff.unchanged).cloned().collect();
        prop_assert_eq!(&before, &current);

        prop_assert!(diff.to_add.is_disjoint(&diff.to_remove));
        prop_assert!(diff.to_add.is_disjoint(&diff.unchanged));
        prop_assert!(diff.to_remove.is_disjoint(&diff.unchanged));
    }

    #[test]
    fn prop_diff_after_apply_is_empty(desired in members(), current in members()) {
        let diff = MembershipDiff::compute(&desired, &current);
        let applied: BTreeSet<_> = current
            .iter()
            .filter(|m| !diff.to_remove.contains(*m))
            .chain(diff.to_add.iter())
            .cloned()
            .collect();
        prop_assert!(MembershipDiff::compute(&desired, &applied).is_empty());
    }
}
