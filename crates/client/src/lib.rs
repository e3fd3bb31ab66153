//! GraphQL adapter for the remote ledger.
//!
//! [`GraphqlLedgerClient`] implements [`ledgerform_core::LedgerClient`] over
//! HTTP. Documents are derived from the entity schemas in `ledgerform-core`.

mod documents;
pub mod graphql;
mod response;

pub use graphql::{ClientBuildError, GraphqlLedgerClient};
