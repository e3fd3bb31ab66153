//! Declarative reconciliation of ledger entities.
//!
//! This module implements:
//! - Field schemas for accounts, account sets, journals and integrations
//! - Desired state, local mirrors and changesets
//! - The create/read/update reconciler

pub mod kinds;
pub mod reconciler;
pub mod record;
pub mod schema;

#[cfg(test)]
mod record_props;

pub use kinds::{Account, AccountSet, BigQueryIntegration, BitfinexIntegration, Journal, Kind};
pub use reconciler::EntityReconciler;
pub use record::{Changeset, Desired, Entity};
pub use schema::{Access, EntityKind, FieldSpec, FieldType, FieldValue, Fields, Schema};
