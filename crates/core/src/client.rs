//! The remote ledger capability.
//!
//! Everything the reconciler needs from the ledger service is behind
//! [`LedgerClient`]. The GraphQL adapter lives in `ledgerform-client`; tests
//! use the generated mock or the in-memory fake.

use async_trait::async_trait;

use ledgerform_shared::types::{AccountId, AccountSetId, JournalId, Page, PageRequest};

use crate::entity::EntityKind;
use crate::error::ClientError;
use crate::membership::MemberRef;

/// A JSON object keyed by remote (camelCase) field names.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Operations offered by the remote ledger.
///
/// Implementations classify every failure into a [`ClientError`]. An entity
/// that does not exist must be reported as [`ClientError::NotFound`], and a
/// membership that already exists as [`ClientError::Duplicate`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Creates an entity and returns the remote record.
    async fn create_entity(&self, kind: EntityKind, input: Payload) -> Result<Payload, ClientError>;

    /// Fetches an entity by id.
    async fn get_entity(&self, kind: EntityKind, id: String) -> Result<Payload, ClientError>;

    /// Applies a partial update and returns the remote record.
    async fn update_entity(
        &self,
        kind: EntityKind,
        id: String,
        input: Payload,
    ) -> Result<Payload, ClientError>;

    /// Adds an account or a nested account set to a set.
    async fn add_member(&self, container: AccountSetId, member: MemberRef) -> Result<(), ClientError>;

    /// Removes an account or a nested account set from a set.
    async fn remove_member(
        &self,
        container: AccountSetId,
        member: MemberRef,
    ) -> Result<(), ClientError>;

    /// Lists one page of a set's direct members.
    async fn list_set_members(
        &self,
        container: AccountSetId,
        page: PageRequest,
    ) -> Result<Page<MemberRef>, ClientError>;

    /// Lists one page of the sets an account belongs to.
    async fn list_account_memberships(
        &self,
        account: AccountId,
        page: PageRequest,
    ) -> Result<Page<AccountSetId>, ClientError>;

    /// Creates the balance sheet of a journal.
    async fn create_balance_sheet(&self, journal: JournalId) -> Result<Payload, ClientError>;

    /// Fetches the balance sheet of a journal.
    async fn get_balance_sheet(&self, journal: JournalId) -> Result<Payload, ClientError>;
}
