//! GraphQL response decoding and error classification.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use ledgerform_core::{ClientError, MemberRef, Payload};
use ledgerform_shared::types::{AccountId, AccountSetId, Page};

/// Top-level GraphQL response.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlResponse {
    #[serde(default)]
    pub(crate) data: Option<Value>,
    #[serde(default)]
    pub(crate) errors: Vec<GraphqlError>,
}

/// One entry of the `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GraphqlError {
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) extensions: Option<Value>,
}

impl GraphqlError {
    fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|extensions| extensions.get("code"))
            .and_then(Value::as_str)
    }
}

/// Maps GraphQL errors to a [`ClientError`], by extension code first and
/// then by message text. The first error decides; all messages are kept.
pub(crate) fn classify(errors: &[GraphqlError]) -> ClientError {
    let message = errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let Some(first) = errors.first() else {
        return ClientError::Transport("empty error list".to_string());
    };

    let by_code = first.code().and_then(|code| match code.to_ascii_uppercase().as_str() {
        "NOT_FOUND" => Some(ClientError::NotFound(message.clone())),
        "DUPLICATE" | "ALREADY_EXISTS" => Some(ClientError::Duplicate(message.clone())),
        "CONFLICT" | "CONCURRENT_MODIFICATION" => Some(ClientError::Conflict(message.clone())),
        "BAD_USER_INPUT" | "VALIDATION" | "GRAPHQL_VALIDATION_FAILED" => {
            Some(ClientError::Validation(message.clone()))
        }
        _ => None,
    });
    by_code.unwrap_or_else(|| classify_message(&first.message, message))
}

fn classify_message(first: &str, message: String) -> ClientError {
    let lower = first.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

    if has(&["not found", "notfound", "does not exist"]) {
        ClientError::NotFound(message)
    } else if has(&["duplicate", "already exists", "already a member", "already member"]) {
        ClientError::Duplicate(message)
    } else if has(&["conflict", "concurrent"]) {
        ClientError::Conflict(message)
    } else if has(&["invalid", "validation", "cycle", "must "]) {
        ClientError::Validation(message)
    } else {
        ClientError::Transport(message)
    }
}

/// Follows `path` from `data`. `None` if any step is missing or null.
pub(crate) fn extract<'v>(data: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter()
        .try_fold(data, |value, key| value.get(key))
        .filter(|value| !value.is_null())
}

/// Takes a JSON object as a payload.
pub(crate) fn into_payload(value: Value) -> Result<Payload, ClientError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ClientError::Transport(format!(
            "malformed response: expected an object, got {other}"
        ))),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value)
        .map_err(|err| ClientError::Transport(format!("malformed response: {err}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    page_info: PageInfo,
    nodes: Vec<T>,
}

impl<T> Connection<T> {
    fn into_page<U>(self, map: impl FnMut(T) -> U) -> Page<U> {
        Page::new(
            self.nodes.into_iter().map(map).collect(),
            self.page_info.has_next_page,
            self.page_info.end_cursor,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum MemberNode {
    Account {
        #[serde(rename = "accountId")]
        account_id: AccountId,
    },
    AccountSet {
        #[serde(rename = "accountSetId")]
        account_set_id: AccountSetId,
    },
}

impl From<MemberNode> for MemberRef {
    fn from(node: MemberNode) -> Self {
        match node {
            MemberNode::Account { account_id } => Self::Account(account_id),
            MemberNode::AccountSet { account_set_id } => Self::AccountSet(account_set_id),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetNode {
    account_set_id: AccountSetId,
}

/// Decodes an `accountSet.members` connection.
pub(crate) fn members_page(connection: Value) -> Result<Page<MemberRef>, ClientError> {
    Ok(decode::<Connection<MemberNode>>(connection)?.into_page(MemberRef::from))
}

/// Decodes an `account.sets` connection.
pub(crate) fn sets_page(connection: Value) -> Result<Page<AccountSetId>, ClientError> {
    Ok(decode::<Connection<SetNode>>(connection)?.into_page(|node| node.account_set_id))
}
