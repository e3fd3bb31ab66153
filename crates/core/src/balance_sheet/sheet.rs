//! The fixed slot layout of a balance sheet.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ledgerform_shared::types::{AccountSetId, EntityId, JournalId};

use crate::client::Payload;
use crate::error::{OpContext, ReconcileError};

/// One of the fourteen account-set slots of a balance sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSheetSlot {
    /// Assets.
    Assets,
    /// Liabilities.
    Liabilities,
    /// Schedule 1.
    Schedule1,
    /// Schedule 2.
    Schedule2,
    /// Schedule 3.
    Schedule3,
    /// Schedule 4.
    Schedule4,
    /// Schedule 5.
    Schedule5,
    /// Schedule 6.
    Schedule6,
    /// Schedule 7.
    Schedule7,
    /// Schedule 8.
    Schedule8,
    /// Schedule 9.
    Schedule9,
    /// Schedule 10.
    Schedule10,
    /// Schedule 11.
    Schedule11,
    /// Schedule 12.
    Schedule12,
}

impl BalanceSheetSlot {
    /// Every slot, in layout order.
    pub const ALL: [Self; 14] = [
        Self::Assets,
        Self::Liabilities,
        Self::Schedule1,
        Self::Schedule2,
        Self::Schedule3,
        Self::Schedule4,
        Self::Schedule5,
        Self::Schedule6,
        Self::Schedule7,
        Self::Schedule8,
        Self::Schedule9,
        Self::Schedule10,
        Self::Schedule11,
        Self::Schedule12,
    ];

    /// Returns the remote field name of the slot.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Liabilities => "liabilities",
            Self::Schedule1 => "schedule1",
            Self::Schedule2 => "schedule2",
            Self::Schedule3 => "schedule3",
            Self::Schedule4 => "schedule4",
            Self::Schedule5 => "schedule5",
            Self::Schedule6 => "schedule6",
            Self::Schedule7 => "schedule7",
            Self::Schedule8 => "schedule8",
            Self::Schedule9 => "schedule9",
            Self::Schedule10 => "schedule10",
            Self::Schedule11 => "schedule11",
            Self::Schedule12 => "schedule12",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BalanceSheetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A journal's balance sheet: one account set per slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// Owning journal.
    pub journal_id: JournalId,
    slots: [AccountSetId; 14],
}

impl BalanceSheet {
    /// Returns the account set in a slot.
    #[must_use]
    pub fn slot(&self, slot: BalanceSheetSlot) -> &AccountSetId {
        &self.slots[slot.index()]
    }

    /// Iterates slots with their account sets, in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (BalanceSheetSlot, &AccountSetId)> {
        BalanceSheetSlot::ALL.into_iter().zip(self.slots.iter())
    }

    /// Decodes `{ "<slot>": { "accountSetId": "..." }, ... }`.
    ///
    /// All fourteen slots must be present.
    pub(crate) fn from_payload(
        journal_id: JournalId,
        payload: &Payload,
        context: &OpContext,
    ) -> Result<Self, ReconcileError> {
        let mut slots = Vec::with_capacity(BalanceSheetSlot::ALL.len());
        for slot in BalanceSheetSlot::ALL {
            let raw = payload
                .get(slot.wire_name())
                .and_then(|value| value.get("accountSetId"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ReconcileError::malformed(context.clone(), format!("slot {slot} has no account set"))
                })?;
            let id = AccountSetId::parse(raw)
                .map_err(|err| ReconcileError::malformed(context.clone(), format!("slot {slot}: {err}")))?;
            slots.push(id);
        }
        let slots: [AccountSetId; 14] = slots
            .try_into()
            .map_err(|_| ReconcileError::malformed(context.clone(), "wrong slot count"))?;
        Ok(Self { journal_id, slots })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Phase, ResourceKind};
    use serde_json::json;

    fn ctx() -> OpContext {
        OpContext::new(ResourceKind::BalanceSheet, "journal-1", Phase::Read)
    }

    fn full_payload() -> Payload {
        BalanceSheetSlot::ALL
            .iter()
            .map(|slot| (slot.wire_name().to_string(), json!({"accountSetId": format!("bs-{slot}")})))
            .collect()
    }

    #[test]
    fn test_slot_order_and_names() {
        assert_eq!(BalanceSheetSlot::ALL[0].wire_name(), "assets");
        assert_eq!(BalanceSheetSlot::ALL[13].wire_name(), "schedule12");
        for (i, slot) in BalanceSheetSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }

    #[test]
    fn test_from_payload_fills_every_slot() {
        let journal = JournalId::new("journal-1").unwrap();
        let sheet = BalanceSheet::from_payload(journal, &full_payload(), &ctx()).unwrap();

        assert_eq!(sheet.slot(BalanceSheetSlot::Assets).as_str(), "bs-assets");
        assert_eq!(sheet.slot(BalanceSheetSlot::Schedule7).as_str(), "bs-schedule7");
        assert_eq!(sheet.iter().count(), 14);
    }

    #[test]
    fn test_missing_slot_is_malformed() {
        let mut payload = full_payload();
        payload.remove("schedule12");

        let err = BalanceSheet::from_payload(JournalId::new("journal-1").unwrap(), &payload, &ctx())
            .unwrap_err();
        assert!(err.to_string().contains("schedule12"));
    }
}
