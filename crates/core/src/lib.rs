//! Reconciliation core for Ledgerform.
//!
//! This crate turns declarative ledger state into the minimal sequence of
//! remote operations. It has ZERO transport dependencies: the remote is reached
//! through the [`client::LedgerClient`] trait.
//!
//! # Modules
//!
//! - `enums` - Remote enum tokens and their typed forms
//! - `entity` - Schema-driven accounts, account sets, journals and integrations
//! - `membership` - Account-set membership edges
//! - `balance_sheet` - The fourteen-slot balance sheet composite
//! - `pass` - A full manifest pass and its dry-run plan
//! - `error` - Error classification

pub mod balance_sheet;
pub mod client;
pub mod entity;
pub mod enums;
pub mod error;
pub mod membership;
pub mod pass;

mod cancel;

#[cfg(test)]
mod enums_props;
#[cfg(test)]
mod testing;

pub use balance_sheet::{BalanceSheet, BalanceSheetAssembler, BalanceSheetSlot};
pub use client::{LedgerClient, Payload};
pub use entity::{Changeset, Desired, Entity, EntityKind, EntityReconciler, Kind};
pub use enums::{DebitOrCredit, EnumError, RemoteEnum, Status};
pub use error::{ClientError, ErrorKind, OpContext, Phase, ReconcileError, ResourceKind};
pub use membership::{MemberRef, MembershipDiff, MembershipEdge, MembershipGraph};
pub use pass::{Manifest, Mirror, PassReport, Plan, PlannedChange, ReconcilePass};
