//! In-memory ledger used by scenario tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use ledgerform_shared::types::{AccountId, AccountSetId, EntityId, JournalId, Page, PageRequest};

use crate::balance_sheet::BalanceSheetSlot;
use crate::client::{LedgerClient, Payload};
use crate::entity::{Access, EntityKind};
use crate::error::ClientError;
use crate::membership::MemberRef;

/// One request the fake received.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Create(EntityKind, String),
    Get(EntityKind, String),
    Update(EntityKind, String, Payload),
    Add(AccountSetId, MemberRef),
    Remove(AccountSetId, MemberRef),
    ListMembers(AccountSetId),
    ListMemberships(AccountId),
    CreateSheet(JournalId),
    GetSheet(JournalId),
}

#[derive(Default)]
struct State {
    entities: HashMap<(EntityKind, String), Payload>,
    members: BTreeMap<AccountSetId, BTreeSet<MemberRef>>,
    sheets: HashMap<JournalId, Payload>,
    rejected: HashMap<MemberRef, ClientError>,
    calls: Vec<Call>,
}

/// A ledger that keeps everything in memory and records every call.
///
/// Behaves like the remote service: write-only fields are never echoed,
/// server-computed fields are filled in, duplicates and missing records are
/// reported with the matching [`ClientError`].
#[derive(Default)]
pub(crate) struct InMemoryLedger {
    state: Mutex<State>,
}

impl InMemoryLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Calls other than reads and listings.
    pub(crate) fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    Call::Create(..) | Call::Update(..) | Call::Add(..) | Call::Remove(..) | Call::CreateSheet(_)
                )
            })
            .collect()
    }

    pub(crate) fn entity(&self, kind: EntityKind, id: &str) -> Option<Payload> {
        self.state
            .lock()
            .unwrap()
            .entities
            .get(&(kind, id.to_string()))
            .cloned()
    }

    /// Simulates an out-of-band deletion.
    pub(crate) fn forget(&self, kind: EntityKind, id: &str) {
        self.state
            .lock()
            .unwrap()
            .entities
            .remove(&(kind, id.to_string()));
    }

    pub(crate) fn members_of(&self, container: &str) -> BTreeSet<MemberRef> {
        let state = self.state.lock().unwrap();
        state
            .members
            .iter()
            .find(|(id, _)| id.as_str() == container)
            .map(|(_, members)| members.clone())
            .unwrap_or_default()
    }

    /// Makes every add of `member` fail with `error`.
    pub(crate) fn reject_member(&self, member: MemberRef, error: ClientError) {
        self.state.lock().unwrap().rejected.insert(member, error);
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn echo(kind: EntityKind, mut record: Payload) -> Payload {
    for field in kind.schema().fields {
        if field.access == Access::WriteOnly {
            record.remove(field.wire);
        }
    }
    record
}

fn computed(kind: EntityKind, id: &str, record: &mut Payload) {
    match kind {
        EntityKind::Account => {
            record
                .entry("normalBalanceType")
                .or_insert_with(|| json!("CREDIT"));
        }
        EntityKind::BitfinexIntegration => {
            record.insert("omnibusAccountSetId".into(), json!(format!("{id}-omnibus")));
        }
        _ => {}
    }
}

fn paginate<T: Clone>(items: &[T], page: &PageRequest) -> Page<T> {
    let start = page
        .after
        .as_deref()
        .and_then(|cursor| cursor.parse::<usize>().ok())
        .unwrap_or(0);
    let end = (start + page.first as usize).min(items.len());
    let slice = items.get(start..end).unwrap_or_default().to_vec();
    Page::new(slice, end < items.len(), Some(end.to_string()))
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn create_entity(&self, kind: EntityKind, input: Payload) -> Result<Payload, ClientError> {
        let identity = kind.schema().identity().wire;
        let id = input
            .get(identity)
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Validation(format!("{identity} is required")))?
            .to_string();
        self.record(Call::Create(kind, id.clone()));

        let mut state = self.state.lock().unwrap();
        let key = (kind, id.clone());
        if state.entities.contains_key(&key) {
            return Err(ClientError::Duplicate(format!("{kind} {id} already exists")));
        }
        let mut record = echo(kind, input);
        computed(kind, &id, &mut record);
        state.entities.insert(key, record.clone());
        Ok(record)
    }

    async fn get_entity(&self, kind: EntityKind, id: String) -> Result<Payload, ClientError> {
        self.record(Call::Get(kind, id.clone()));
        self.state
            .lock()
            .unwrap()
            .entities
            .get(&(kind, id.clone()))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("{kind} {id} not found")))
    }

    async fn update_entity(
        &self,
        kind: EntityKind,
        id: String,
        input: Payload,
    ) -> Result<Payload, ClientError> {
        self.record(Call::Update(kind, id.clone(), input.clone()));
        let mut state = self.state.lock().unwrap();
        let record = state
            .entities
            .get_mut(&(kind, id.clone()))
            .ok_or_else(|| ClientError::NotFound(format!("{kind} {id} not found")))?;
        for (field, value) in input {
            if value.is_null() {
                record.remove(&field);
            } else {
                record.insert(field, value);
            }
        }
        Ok(record.clone())
    }

    async fn add_member(&self, container: AccountSetId, member: MemberRef) -> Result<(), ClientError> {
        self.record(Call::Add(container.clone(), member.clone()));
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.rejected.get(&member) {
            return Err(error.clone());
        }
        if !state.members.entry(container.clone()).or_default().insert(member) {
            return Err(ClientError::Duplicate(format!("already a member of {container}")));
        }
        Ok(())
    }

    async fn remove_member(&self, container: AccountSetId, member: MemberRef) -> Result<(), ClientError> {
        self.record(Call::Remove(container.clone(), member.clone()));
        let mut state = self.state.lock().unwrap();
        let removed = state
            .members
            .get_mut(&container)
            .is_some_and(|members| members.remove(&member));
        if removed {
            Ok(())
        } else {
            Err(ClientError::NotFound(format!("{member} is not a member of {container}")))
        }
    }

    async fn list_set_members(
        &self,
        container: AccountSetId,
        page: PageRequest,
    ) -> Result<Page<MemberRef>, ClientError> {
        self.record(Call::ListMembers(container.clone()));
        let state = self.state.lock().unwrap();
        let members: Vec<MemberRef> = state
            .members
            .get(&container)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default();
        Ok(paginate(&members, &page))
    }

    async fn list_account_memberships(
        &self,
        account: AccountId,
        page: PageRequest,
    ) -> Result<Page<AccountSetId>, ClientError> {
        self.record(Call::ListMemberships(account.clone()));
        let member = MemberRef::Account(account);
        let state = self.state.lock().unwrap();
        let sets: Vec<AccountSetId> = state
            .members
            .iter()
            .filter(|(_, members)| members.contains(&member))
            .map(|(set, _)| set.clone())
            .collect();
        Ok(paginate(&sets, &page))
    }

    async fn create_balance_sheet(&self, journal: JournalId) -> Result<Payload, ClientError> {
        self.record(Call::CreateSheet(journal.clone()));
        let mut state = self.state.lock().unwrap();
        if state.sheets.contains_key(&journal) {
            return Err(ClientError::Duplicate(format!("balance sheet for {journal} already exists")));
        }
        let sheet: Payload = BalanceSheetSlot::ALL
            .iter()
            .map(|slot| {
                (
                    slot.wire_name().to_string(),
                    json!({"accountSetId": format!("{}-{slot}", journal.as_str())}),
                )
            })
            .collect();
        state.sheets.insert(journal, sheet.clone());
        Ok(sheet)
    }

    async fn get_balance_sheet(&self, journal: JournalId) -> Result<Payload, ClientError> {
        self.record(Call::GetSheet(journal.clone()));
        self.state
            .lock()
            .unwrap()
            .sheets
            .get(&journal)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("no balance sheet for {journal}")))
    }
}
