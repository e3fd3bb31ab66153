//! `LedgerClient` over the ledger's GraphQL HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use ledgerform_core::entity::FieldType;
use ledgerform_core::{ClientError, EntityKind, LedgerClient, MemberRef, Payload, RemoteEnum, Status};
use ledgerform_shared::LedgerConfig;
use ledgerform_shared::types::{AccountId, AccountSetId, EntityId, JournalId, Page, PageRequest};

use crate::documents::{self, Document};
use crate::response::{self, GraphqlResponse};

/// Errors raised while building a [`GraphqlLedgerClient`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured endpoint is not an absolute http(s) URL.
    #[error("invalid ledger endpoint '{0}'")]
    Endpoint(String),
}

/// GraphQL client for the remote ledger.
#[derive(Debug, Clone)]
pub struct GraphqlLedgerClient {
    http: Client,
    endpoint: Url,
}

impl GraphqlLedgerClient {
    /// Builds a client from the ledger configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid http(s) URL or the
    /// HTTP client cannot be built.
    pub fn new(config: &LedgerConfig) -> Result<Self, ClientBuildError> {
        let endpoint = Url::parse(config.endpoint.trim())
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| ClientBuildError::Endpoint(config.endpoint.clone()))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("ledgerform/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, endpoint })
    }

    /// The endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Posts one operation and returns its `data` object.
    async fn execute(&self, operation: &str, query: &str, variables: Value) -> Result<Value, ClientError> {
        debug!(operation, "Sending ledger request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| self.transport(operation, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport(operation, &e))?;
        let parsed = serde_json::from_str::<GraphqlResponse>(&body);

        if !status.is_success() {
            return Err(match parsed {
                Ok(graphql) if !graphql.errors.is_empty() => response::classify(&graphql.errors),
                _ => ClientError::Transport(format!("{operation}: HTTP {status}: {}", excerpt(&body))),
            });
        }

        let graphql = parsed
            .map_err(|e| ClientError::Transport(format!("{operation}: malformed response: {e}")))?;
        if !graphql.errors.is_empty() {
            let err = response::classify(&graphql.errors);
            debug!(operation, error = %err, "Ledger request rejected");
            return Err(err);
        }
        graphql
            .data
            .ok_or_else(|| ClientError::Transport(format!("{operation}: response carried no data")))
    }

    /// Runs `document` and returns the object at its path.
    async fn fetch(&self, document: &Document, variables: Value, missing: &str) -> Result<Value, ClientError> {
        let data = self.execute(document.operation, &document.query, variables).await?;
        response::extract(&data, &document.path)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(missing.to_string()))
    }

    async fn membership(
        &self,
        query: &str,
        operation: &str,
        container: &AccountSetId,
        member: &MemberRef,
    ) -> Result<(), ClientError> {
        let member_type = if member.is_account_set() { "ACCOUNT_SET" } else { "ACCOUNT" };
        let input = json!({
            "accountSetId": container.as_str(),
            "memberId": member.id(),
            "memberType": member_type,
        });
        self.execute(operation, query, json!({ "input": input })).await?;
        Ok(())
    }

    fn transport(&self, operation: &str, err: &reqwest::Error) -> ClientError {
        let reason = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            format!("cannot connect to {}", self.endpoint)
        } else {
            err.to_string()
        };
        warn!(operation, %reason, "Ledger request failed");
        ClientError::Transport(format!("{operation}: {reason}"))
    }
}

fn excerpt(body: &str) -> &str {
    const LIMIT: usize = 200;
    match body.char_indices().nth(LIMIT) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

/// The ledger names an inactive status `LOCKED` on input.
const LOCKED: &str = "LOCKED";

/// Rewrites status tokens in an entity input to the ledger's spelling.
fn wire_input(kind: EntityKind, mut input: Payload) -> Payload {
    let inactive = Status::Inactive.encode();
    for field in kind.schema().fields.iter().filter(|field| field.ty == FieldType::Status) {
        if let Some(value) = input.get_mut(field.wire)
            && value.as_str() == Some(inactive)
        {
            *value = Value::from(LOCKED);
        }
    }
    input
}

fn page_variables(id: &str, page: &PageRequest) -> Value {
    json!({ "id": id, "first": page.first, "after": page.after })
}

#[async_trait]
impl LedgerClient for GraphqlLedgerClient {
    async fn create_entity(&self, kind: EntityKind, input: Payload) -> Result<Payload, ClientError> {
        let document = documents::create(kind);
        let created = self
            .fetch(
                &document,
                json!({ "input": wire_input(kind, input) }),
                &format!("{kind} create returned nothing"),
            )
            .await?;
        response::into_payload(created)
    }

    async fn get_entity(&self, kind: EntityKind, id: String) -> Result<Payload, ClientError> {
        let document = documents::get(kind);
        let found = self
            .fetch(&document, json!({ "id": id }), &format!("{kind} {id} not found"))
            .await?;
        response::into_payload(found)
    }

    async fn update_entity(
        &self,
        kind: EntityKind,
        id: String,
        input: Payload,
    ) -> Result<Payload, ClientError> {
        let document = documents::update(kind)
            .ok_or_else(|| ClientError::Validation(format!("{kind} cannot be updated")))?;
        let updated = self
            .fetch(
                &document,
                json!({ "id": id, "input": wire_input(kind, input) }),
                &format!("{kind} {id} not found"),
            )
            .await?;
        response::into_payload(updated)
    }

    async fn add_member(&self, container: AccountSetId, member: MemberRef) -> Result<(), ClientError> {
        self.membership(documents::ADD_TO_ACCOUNT_SET, "addToAccountSet", &container, &member)
            .await
    }

    async fn remove_member(
        &self,
        container: AccountSetId,
        member: MemberRef,
    ) -> Result<(), ClientError> {
        self.membership(
            documents::REMOVE_FROM_ACCOUNT_SET,
            "removeFromAccountSet",
            &container,
            &member,
        )
        .await
    }

    async fn list_set_members(
        &self,
        container: AccountSetId,
        page: PageRequest,
    ) -> Result<Page<MemberRef>, ClientError> {
        let data = self
            .execute("accountSetMembers", documents::SET_MEMBERS, page_variables(container.as_str(), &page))
            .await?;
        let connection = response::extract(&data, &["accountSet", "members"])
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("account set {container} not found")))?;
        response::members_page(connection)
    }

    async fn list_account_memberships(
        &self,
        account: AccountId,
        page: PageRequest,
    ) -> Result<Page<AccountSetId>, ClientError> {
        let data = self
            .execute("accountSets", documents::ACCOUNT_SETS, page_variables(account.as_str(), &page))
            .await?;
        let connection = response::extract(&data, &["account", "sets"])
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("account {account} not found")))?;
        response::sets_page(connection)
    }

    async fn create_balance_sheet(&self, journal: JournalId) -> Result<Payload, ClientError> {
        let document = documents::balance_sheet_create();
        let sheet = self
            .fetch(
                &document,
                json!({ "input": { "journalId": journal.as_str() } }),
                &format!("balance sheet create for {journal} returned nothing"),
            )
            .await?;
        response::into_payload(sheet)
    }

    async fn get_balance_sheet(&self, journal: JournalId) -> Result<Payload, ClientError> {
        let document = documents::balance_sheet_get();
        let sheet = self
            .fetch(
                &document,
                json!({ "journalId": journal.as_str() }),
                &format!("no balance sheet for {journal}"),
            )
            .await?;
        response::into_payload(sheet)
    }
}
