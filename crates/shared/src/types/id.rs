//! Typed IDs for type-safe entity references.
//!
//! Ledger ids are caller-assigned strings. Wrapping them prevents accidentally
//! passing an `AccountId` where an `AccountSetId` is expected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when an id string cannot be used as an entity id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The id is empty or only whitespace.
    #[error("id must not be empty")]
    Empty,

    /// The id contains a `/`, which is reserved for membership edge ids.
    #[error("id '{0}' must not contain '/'")]
    ReservedSeparator(String),
}

/// Common behaviour of every typed entity id.
pub trait EntityId:
    Clone + Ord + std::hash::Hash + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static
{
    /// Wraps a raw id after validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or contains `/`.
    fn parse(raw: impl Into<String>) -> Result<Self, IdError>;

    /// Returns the raw id string.
    fn as_str(&self) -> &str;
}

fn validate(raw: &str) -> Result<(), IdError> {
    if raw.trim().is_empty() {
        return Err(IdError::Empty);
    }
    if raw.contains('/') {
        return Err(IdError::ReservedSeparator(raw.to_string()));
    }
    Ok(())
}

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from a raw string.
            ///
            /// # Errors
            ///
            /// Returns an error if the id is empty or contains `/`.
            pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
                let raw = raw.into();
                validate(&raw)?;
                Ok(Self(raw))
            }

            /// Returns the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl EntityId for $name {
            fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
                Self::new(raw)
            }

            fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

typed_id!(AccountId, "Caller-assigned identifier of a ledger account.");
typed_id!(AccountSetId, "Identifier of an account set.");
typed_id!(JournalId, "Identifier of a journal.");
typed_id!(
    IntegrationId,
    "Identifier of a third-party integration (BigQuery export, exchange feed)."
);
