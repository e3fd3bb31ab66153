//! GraphQL documents for the ledger API.
//!
//! Entity selections are generated from the field schemas, so a field added
//! to a schema is requested and sent without touching this module.

use ledgerform_core::BalanceSheetSlot;
use ledgerform_core::entity::EntityKind;

/// A query or mutation plus the path from `data` to the object of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Document {
    pub(crate) operation: &'static str,
    pub(crate) query: String,
    pub(crate) path: Vec<&'static str>,
}

/// Where an entity kind lives in the GraphQL schema.
struct Route {
    namespace: Option<&'static str>,
    create: &'static str,
    create_input: &'static str,
    payload: &'static str,
    get: &'static str,
    update: Option<(&'static str, &'static str)>,
}

const fn route(kind: EntityKind) -> Route {
    match kind {
        EntityKind::Account => Route {
            namespace: None,
            create: "accountCreate",
            create_input: "AccountCreateInput",
            payload: "account",
            get: "account",
            update: Some(("accountUpdate", "AccountUpdateInput")),
        },
        EntityKind::AccountSet => Route {
            namespace: None,
            create: "accountSetCreate",
            create_input: "AccountSetCreateInput",
            payload: "accountSet",
            get: "accountSet",
            update: Some(("accountSetUpdate", "AccountSetUpdateInput")),
        },
        EntityKind::Journal => Route {
            namespace: None,
            create: "journalCreate",
            create_input: "JournalCreateInput",
            payload: "journal",
            get: "journal",
            update: Some(("journalUpdate", "JournalUpdateInput")),
        },
        EntityKind::BigQueryIntegration => Route {
            namespace: Some("bigQuery"),
            create: "integrationCreate",
            create_input: "BigQueryIntegrationCreateInput",
            payload: "integration",
            get: "integration",
            update: None,
        },
        EntityKind::BitfinexIntegration => Route {
            namespace: Some("bitfinex"),
            create: "integrationCreate",
            create_input: "BitfinexIntegrationCreateInput",
            payload: "integration",
            get: "integration",
            update: None,
        },
    }
}

/// Readable fields of a kind, space separated.
fn selection(kind: EntityKind) -> String {
    kind.schema()
        .fields
        .iter()
        .filter(|field| field.is_readable())
        .map(|field| field.wire)
        .collect::<Vec<_>>()
        .join(" ")
}

fn wrap(namespace: Option<&'static str>, body: &str) -> String {
    match namespace {
        Some(namespace) => format!("{namespace} {{ {body} }}"),
        None => body.to_string(),
    }
}

fn path(namespace: Option<&'static str>, rest: &[&'static str]) -> Vec<&'static str> {
    namespace.into_iter().chain(rest.iter().copied()).collect()
}

/// `mutation($input)` creating an entity.
pub(crate) fn create(kind: EntityKind) -> Document {
    let route = route(kind);
    let body = format!(
        "{}(input: $input) {{ {} {{ {} }} }}",
        route.create,
        route.payload,
        selection(kind)
    );
    Document {
        operation: route.create,
        query: format!(
            "mutation Create($input: {}!) {{ {} }}",
            route.create_input,
            wrap(route.namespace, &body)
        ),
        path: path(route.namespace, &[route.create, route.payload]),
    }
}

/// `query($id)` fetching an entity.
pub(crate) fn get(kind: EntityKind) -> Document {
    let route = route(kind);
    let body = format!("{}(id: $id) {{ {} }}", route.get, selection(kind));
    Document {
        operation: route.get,
        query: format!("query Get($id: UUID!) {{ {} }}", wrap(route.namespace, &body)),
        path: path(route.namespace, &[route.get]),
    }
}

/// `mutation($id, $input)` updating an entity. `None` for kinds without one.
pub(crate) fn update(kind: EntityKind) -> Option<Document> {
    let route = route(kind);
    let (field, input) = route.update?;
    Some(Document {
        operation: field,
        query: format!(
            "mutation Update($id: UUID!, $input: {input}!) {{ {field}(id: $id, input: $input) {{ {} {{ {} }} }} }}",
            route.payload,
            selection(kind)
        ),
        path: vec![field, route.payload],
    })
}

pub(crate) const ADD_TO_ACCOUNT_SET: &str = "mutation AddToAccountSet($input: AddToAccountSetInput!) { \
     addToAccountSet(input: $input) { accountSet { accountSetId } } }";

pub(crate) const REMOVE_FROM_ACCOUNT_SET: &str = "mutation RemoveFromAccountSet($input: RemoveFromAccountSetInput!) { \
     removeFromAccountSet(input: $input) { accountSet { accountSetId } } }";

pub(crate) const SET_MEMBERS: &str = "query SetMembers($id: UUID!, $first: Int!, $after: String) { \
     accountSet(id: $id) { members(first: $first, after: $after) { \
     pageInfo { hasNextPage endCursor } \
     nodes { __typename ... on Account { accountId } ... on AccountSet { accountSetId } } } } }";

pub(crate) const ACCOUNT_SETS: &str = "query AccountSets($id: UUID!, $first: Int!, $after: String) { \
     account(id: $id) { sets(first: $first, after: $after) { \
     pageInfo { hasNextPage endCursor } nodes { accountSetId } } } }";

fn slot_selection() -> String {
    BalanceSheetSlot::ALL
        .iter()
        .map(|slot| format!("{} {{ accountSetId }}", slot.wire_name()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Balance sheet creation for a journal.
pub(crate) fn balance_sheet_create() -> Document {
    Document {
        operation: "balanceSheetCreate",
        query: format!(
            "mutation BalanceSheetCreate($input: BalanceSheetCreateInput!) {{ \
             balanceSheet {{ create(input: $input) {{ balanceSheet {{ {} }} }} }} }}",
            slot_selection()
        ),
        path: vec!["balanceSheet", "create", "balanceSheet"],
    }
}

/// Balance sheet lookup by journal.
pub(crate) fn balance_sheet_get() -> Document {
    Document {
        operation: "balanceSheet",
        query: format!(
            "query BalanceSheet($journalId: UUID!) {{ \
             balanceSheet {{ byJournalId(journalId: $journalId) {{ {} }} }} }}",
            slot_selection()
        ),
        path: vec!["balanceSheet", "byJournalId"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_create_document() {
        let doc = create(EntityKind::Account);
        assert!(doc.query.starts_with("mutation Create($input: AccountCreateInput!)"));
        assert!(doc.query.contains("accountCreate(input: $input) { account { accountId name code"));
        assert_eq!(doc.path, vec!["accountCreate", "account"]);
    }

    #[test]
    fn test_write_only_fields_are_never_selected() {
        let doc = get(EntityKind::BitfinexIntegration);
        assert!(doc.query.contains("bitfinex { integration(id: $id)"));
        assert!(doc.query.contains("omnibusAccountSetId"));
        assert!(!doc.query.contains("secret"));
        assert!(!doc.query.contains(" key "));
        assert_eq!(doc.path, vec!["bitfinex", "integration"]);

        assert!(!create(EntityKind::BigQueryIntegration)
            .query
            .contains("serviceAccountCredsBase64"));
    }

    #[test]
    fn test_integrations_have_no_update() {
        assert!(update(EntityKind::BigQueryIntegration).is_none());
        assert!(update(EntityKind::BitfinexIntegration).is_none());

        let doc = update(EntityKind::Journal).unwrap();
        assert!(doc.query.contains("journalUpdate(id: $id, input: $input)"));
        assert_eq!(doc.path, vec!["journalUpdate", "journal"]);
    }

    #[test]
    fn test_balance_sheet_selects_every_slot() {
        let doc = balance_sheet_get();
        for slot in BalanceSheetSlot::ALL {
            assert!(doc.query.contains(&format!("{} {{ accountSetId }}", slot.wire_name())));
        }
    }
}
