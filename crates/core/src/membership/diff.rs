//! Set difference between desired and current memberships.

use std::collections::BTreeSet;

use super::edge::MemberRef;

/// Edge operations needed to turn `current` into `desired`.
///
/// Members are held in ordered sets, so the operation order is deterministic
/// and duplicates in the input collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    /// Members to add.
    pub to_add: BTreeSet<MemberRef>,
    /// Members to remove.
    pub to_remove: BTreeSet<MemberRef>,
    /// Members present on both sides.
    pub unchanged: BTreeSet<MemberRef>,
}

impl MembershipDiff {
    /// Computes the difference.
    #[must_use]
    pub fn compute<'a>(
        desired: impl IntoIterator<Item = &'a MemberRef>,
        current: impl IntoIterator<Item = &'a MemberRef>,
    ) -> Self {
        let desired: BTreeSet<MemberRef> = desired.into_iter().cloned().collect();
        let current: BTreeSet<MemberRef> = current.into_iter().cloned().collect();

        Self {
            to_add: desired.difference(&current).cloned().collect(),
            to_remove: current.difference(&desired).cloned().collect(),
            unchanged: desired.intersection(&current).cloned().collect(),
        }
    }

    /// Returns true if nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Number of edge operations to issue.
    #[must_use]
    pub fn operations(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerform_shared::types::{AccountId, AccountSetId};

    fn account(id: &str) -> MemberRef {
        MemberRef::Account(AccountId::new(id).unwrap())
    }

    fn set(id: &str) -> MemberRef {
        MemberRef::AccountSet(AccountSetId::new(id).unwrap())
    }

    #[test]
    fn test_diff_adds_and_removes() {
        let current = [account("acc-1"), account("acc-2")];
        let desired = [account("acc-2"), account("acc-3")];

        let diff = MembershipDiff::compute(&desired, &current);
        assert_eq!(diff.to_add, BTreeSet::from([account("acc-3")]));
        assert_eq!(diff.to_remove, BTreeSet::from([account("acc-1")]));
        assert_eq!(diff.unchanged, BTreeSet::from([account("acc-2")]));
        assert_eq!(diff.operations(), 2);
    }

    #[test]
    fn test_diff_distinguishes_member_kinds() {
        let current = [account("x")];
        let desired = [set("x")];

        let diff = MembershipDiff::compute(&desired, &current);
        assert_eq!(diff.to_add, BTreeSet::from([set("x")]));
        assert_eq!(diff.to_remove, BTreeSet::from([account("x")]));
    }

    #[test]
    fn test_diff_collapses_duplicates() {
        let desired = [account("acc-1"), account("acc-1")];
        let diff = MembershipDiff::compute(&desired, std::iter::empty());
        assert_eq!(diff.to_add.len(), 1);
    }

    #[test]
    fn test_equal_sets_produce_empty_diff() {
        let members = [account("acc-1"), set("as-2")];
        let diff = MembershipDiff::compute(&members, &members);
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged.len(), 2);
    }
}
