//! Creation and lookup of a journal's balance sheet.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use ledgerform_shared::types::{EntityId, JournalId};

use super::sheet::BalanceSheet;
use crate::cancel::{call, ensure_live};
use crate::client::LedgerClient;
use crate::error::{OpContext, Phase, ReconcileError, ResourceKind};

/// Creates and reads balance sheets.
///
/// The remote builds all fourteen account sets in one call; nothing is
/// created slot by slot. A sheet has no mutable state, so an update is a
/// read-refresh.
pub struct BalanceSheetAssembler<'a, C: LedgerClient + ?Sized> {
    client: &'a C,
    cancel: CancellationToken,
}

impl<'a, C: LedgerClient + ?Sized> BalanceSheetAssembler<'a, C> {
    /// Creates an assembler.
    #[must_use]
    pub fn new(client: &'a C, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Creates the journal's balance sheet.
    ///
    /// # Errors
    ///
    /// Returns the remote failure, or a malformed-response error if any slot
    /// is missing from the answer. A sheet that already exists surfaces as a
    /// conflict.
    #[instrument(skip_all, fields(journal = %journal))]
    pub async fn create(&self, journal: &JournalId) -> Result<BalanceSheet, ReconcileError> {
        let context = context(journal, Phase::Create);
        let payload = call(
            &self.cancel,
            &context,
            self.client.create_balance_sheet(journal.clone()),
        )
        .await?;
        let sheet = BalanceSheet::from_payload(journal.clone(), &payload, &context)?;
        ensure_live(&self.cancel, &context)?;
        info!("balance sheet created");
        Ok(sheet)
    }

    /// Reads the journal's balance sheet. `None` means it does not exist.
    ///
    /// # Errors
    ///
    /// Returns any remote failure other than not-found.
    #[instrument(skip_all, fields(journal = %journal))]
    pub async fn read(&self, journal: &JournalId) -> Result<Option<BalanceSheet>, ReconcileError> {
        let context = context(journal, Phase::Read);
        match call(
            &self.cancel,
            &context,
            self.client.get_balance_sheet(journal.clone()),
        )
        .await
        {
            Ok(payload) => BalanceSheet::from_payload(journal.clone(), &payload, &context).map(Some),
            Err(err) if err.is_not_found() => {
                debug!("balance sheet not found");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Re-reads an existing sheet.
    ///
    /// # Errors
    ///
    /// Returns the remote failure; a vanished sheet is an error here.
    pub async fn update(&self, current: &BalanceSheet) -> Result<BalanceSheet, ReconcileError> {
        let context = context(&current.journal_id, Phase::Update);
        let payload = call(
            &self.cancel,
            &context,
            self.client.get_balance_sheet(current.journal_id.clone()),
        )
        .await?;
        let sheet = BalanceSheet::from_payload(current.journal_id.clone(), &payload, &context)?;
        ensure_live(&self.cancel, &context)?;
        Ok(sheet)
    }

    /// Remote deletion is not offered.
    ///
    /// # Errors
    ///
    /// Always returns [`ReconcileError::Unsupported`].
    pub fn delete(&self, journal: &JournalId) -> Result<(), ReconcileError> {
        Err(ReconcileError::Unsupported {
            context: context(journal, Phase::Delete),
        })
    }

    /// Adopting an existing sheet is not offered.
    ///
    /// # Errors
    ///
    /// Always returns [`ReconcileError::Unsupported`].
    pub fn import(&self, journal: &JournalId) -> Result<BalanceSheet, ReconcileError> {
        Err(ReconcileError::Unsupported {
            context: context(journal, Phase::Import),
        })
    }
}

fn context(journal: &JournalId, phase: Phase) -> OpContext {
    OpContext::new(ResourceKind::BalanceSheet, journal.as_str(), phase)
}
