//! Shared types and configuration for Ledgerform.
//!
//! This crate provides common types used across all other crates:
//! - Typed string IDs for type-safe entity references
//! - Cursor pagination types for remote list queries
//! - Configuration management

pub mod config;
pub mod types;

pub use config::{AppConfig, LedgerConfig};
pub use types::{AccountId, AccountSetId, EntityId, IdError, IntegrationId, JournalId, Page, PageRequest};
