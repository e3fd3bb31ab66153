//! Property-based tests for changesets.
//!
//! - Only mutable fields are ever sent
//! - Applying a changeset makes the next diff empty

use proptest::prelude::*;

use ledgerform_shared::types::AccountId;

use super::kinds::{Account, Kind};
use super::record::{Changeset, Entity};
use super::schema::{Access, FieldValue, Fields};
use crate::enums::{DebitOrCredit, Status};

fn optional_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z]{1,6}")
}

fn account_fields() -> impl Strategy<Value = Fields> {
    (
        "[A-Z][a-z]{0,5}",
        "[A-Z]{2,5}",
        optional_text(),
        prop::option::of(prop_oneof![Just(DebitOrCredit::Debit), Just(DebitOrCredit::Credit)]),
        prop_oneof![Just(Status::Active), Just(Status::Inactive)],
        optional_text(),
    )
        .prop_map(|(name, code, description, balance, status, external)| {
            let mut fields = Fields::new();
            fields.insert("name", FieldValue::Text(name));
            fields.insert("code", FieldValue::Text(code));
            if let Some(description) = description {
                fields.insert("description", FieldValue::Text(description));
            }
            if let Some(balance) = balance {
                fields.insert("normal_balance_type", FieldValue::Balance(balance));
            }
            fields.insert("status", FieldValue::Status(status));
            if let Some(external) = external {
                fields.insert("external_id", FieldValue::Text(external));
            }
            fields
        })
}

fn apply(current: &Entity<Account>, changeset: &Changeset<Account>) -> Entity<Account> {
    let mut fields = current.fields().clone();
    for name in changeset.fields() {
        match changeset.get(name).flatten() {
            Some(value) => {
                fields.insert(name, value.clone());
            }
            None => {
                fields.remove(name);
            }
        }
    }
    Entity::new(current.id().clone(), fields)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// A changeset never carries identity, create-only or write-only fields.
    #[test]
    fn prop_changeset_only_mutable(current in account_fields(), desired in account_fields()) {
        let id = AccountId::new("acc-1").unwrap();
        let changeset = Changeset::between(&Entity::<Account>::new(id, current), &desired);
        for name in changeset.fields() {
            let spec = Account::schema().field(name).unwrap();
            prop_assert_eq!(spec.access, Access::Mutable);
        }
    }

    /// After the changeset lands, the same desired state produces no changes.
    #[test]
    fn prop_applied_changeset_converges(current in account_fields(), desired in account_fields()) {
        let id = AccountId::new("acc-1").unwrap();
        let current = Entity::<Account>::new(id, current);
        let changeset = Changeset::between(&current, &desired);
        let next = apply(&current, &changeset);
        prop_assert!(Changeset::between(&next, &desired).is_empty());
    }

    /// Identical states never produce a changeset.
    #[test]
    fn prop_no_diff_against_self(fields in account_fields()) {
        let id = AccountId::new("acc-1").unwrap();
        let current = Entity::<Account>::new(id, fields.clone());
        prop_assert!(Changeset::between(&current, &fields).is_empty());
    }
}
