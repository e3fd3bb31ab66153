//! Entity kind markers and their field tables.

use std::fmt;

use ledgerform_shared::types::{AccountId, AccountSetId, EntityId, IntegrationId, JournalId};

use super::schema::{Access, EntityKind, FieldSpec, Schema};

/// Type-level marker for an entity kind.
pub trait Kind: fmt::Debug + Clone + Copy + PartialEq + Eq + Send + Sync + 'static {
    /// Runtime kind.
    const KIND: EntityKind;
    /// Id type of this kind.
    type Id: EntityId;

    /// Returns the field schema.
    #[must_use]
    fn schema() -> &'static Schema {
        Self::KIND.schema()
    }
}

macro_rules! kind_marker {
    ($(#[$meta:meta])* $name:ident, $kind:ident, $id:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name;

        impl Kind for $name {
            const KIND: EntityKind = EntityKind::$kind;
            type Id = $id;
        }
    };
}

kind_marker!(
    /// Ledger account.
    Account, Account, AccountId
);
kind_marker!(
    /// Account set.
    AccountSet, AccountSet, AccountSetId
);
kind_marker!(
    /// Journal.
    Journal, Journal, JournalId
);
kind_marker!(
    /// BigQuery export integration.
    BigQueryIntegration, BigQueryIntegration, IntegrationId
);
kind_marker!(
    /// Bitfinex exchange-feed integration.
    BitfinexIntegration, BitfinexIntegration, IntegrationId
);

const ACCOUNT_FIELDS: &[FieldSpec] = &[
    FieldSpec::identity("account_id", "accountId"),
    FieldSpec::text("name", "name", Access::Mutable).required(),
    FieldSpec::text("code", "code", Access::Mutable).required(),
    FieldSpec::text("description", "description", Access::Mutable),
    FieldSpec::balance("normal_balance_type", "normalBalanceType", Access::Mutable).computed(),
    FieldSpec::status("status", "status", Access::CreateOnly).default_value("ACTIVE"),
    FieldSpec::text("external_id", "externalId", Access::Mutable),
];

const ACCOUNT_SET_FIELDS: &[FieldSpec] = &[
    FieldSpec::identity("account_set_id", "accountSetId"),
    FieldSpec::text("journal_id", "journalId", Access::CreateOnly).required(),
    FieldSpec::text("name", "name", Access::Mutable).required(),
    FieldSpec::text("description", "description", Access::Mutable),
    FieldSpec::balance("normal_balance_type", "normalBalanceType", Access::Mutable)
        .default_value("CREDIT"),
];

const JOURNAL_FIELDS: &[FieldSpec] = &[
    FieldSpec::identity("journal_id", "journalId"),
    FieldSpec::text("name", "name", Access::Mutable).required(),
    FieldSpec::text("description", "description", Access::Mutable),
    FieldSpec::status("status", "status", Access::CreateOnly).default_value("ACTIVE"),
];

const BIG_QUERY_FIELDS: &[FieldSpec] = &[
    FieldSpec::identity("integration_id", "integrationId"),
    FieldSpec::text("name", "name", Access::CreateOnly).required(),
    FieldSpec::text("description", "description", Access::CreateOnly),
    FieldSpec::text("gcp_project_id", "gcpProjectId", Access::CreateOnly).required(),
    FieldSpec::text("gcp_dataset_id", "gcpDatasetId", Access::CreateOnly).required(),
    FieldSpec::text(
        "service_account_creds_base64",
        "serviceAccountCredsBase64",
        Access::WriteOnly,
    )
    .required(),
];

const BITFINEX_FIELDS: &[FieldSpec] = &[
    FieldSpec::identity("integration_id", "integrationId"),
    FieldSpec::text("name", "name", Access::CreateOnly).required(),
    FieldSpec::text("description", "description", Access::CreateOnly),
    FieldSpec::text("journal_id", "journalId", Access::CreateOnly).required(),
    FieldSpec::text("key", "key", Access::WriteOnly).required(),
    FieldSpec::text("secret", "secret", Access::WriteOnly).required(),
    FieldSpec::text("omnibus_account_set_id", "omnibusAccountSetId", Access::ReadOnly),
];

pub(crate) static ACCOUNT_SCHEMA: Schema = Schema {
    kind: EntityKind::Account,
    fields: ACCOUNT_FIELDS,
};

pub(crate) static ACCOUNT_SET_SCHEMA: Schema = Schema {
    kind: EntityKind::AccountSet,
    fields: ACCOUNT_SET_FIELDS,
};

pub(crate) static JOURNAL_SCHEMA: Schema = Schema {
    kind: EntityKind::Journal,
    fields: JOURNAL_FIELDS,
};

pub(crate) static BIG_QUERY_SCHEMA: Schema = Schema {
    kind: EntityKind::BigQueryIntegration,
    fields: BIG_QUERY_FIELDS,
};

pub(crate) static BITFINEX_SCHEMA: Schema = Schema {
    kind: EntityKind::BitfinexIntegration,
    fields: BITFINEX_FIELDS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_point_at_their_schema() {
        assert_eq!(Account::schema().kind, EntityKind::Account);
        assert_eq!(AccountSet::schema().kind, EntityKind::AccountSet);
        assert_eq!(Journal::schema().kind, EntityKind::Journal);
        assert_eq!(BigQueryIntegration::schema().kind, EntityKind::BigQueryIntegration);
        assert_eq!(BitfinexIntegration::schema().kind, EntityKind::BitfinexIntegration);
    }

    #[test]
    fn test_integrations_have_no_mutable_fields() {
        for schema in [BigQueryIntegration::schema(), BitfinexIntegration::schema()] {
            assert!(schema.fields.iter().all(|f| f.access != Access::Mutable));
        }
    }

    #[test]
    fn test_account_set_journal_is_create_only() {
        let journal = AccountSet::schema().field("journal_id").unwrap();
        assert_eq!(journal.access, Access::CreateOnly);
        assert!(journal.required);
    }
}
