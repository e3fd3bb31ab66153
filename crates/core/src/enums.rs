//! Conversion between remote enum tokens and typed domain enums.
//!
//! The remote ledger speaks uppercase tokens (`DEBIT`, `ACTIVE`, ...). Lowercase
//! spellings are accepted as synonyms. Anything else is rejected: an unknown
//! balance direction must never be guessed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string is not a recognized enum token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for {type_name}: '{value}' (expected one of {expected})")]
pub struct EnumError {
    /// Name of the enum being decoded.
    pub type_name: &'static str,
    /// The rejected input.
    pub value: String,
    /// Accepted canonical tokens.
    pub expected: &'static str,
}

/// A typed enum with a canonical remote string form.
pub trait RemoteEnum: Sized + Copy + Eq + fmt::Debug + 'static {
    /// Type name used in error messages.
    const NAME: &'static str;
    /// Every defined value.
    const ALL: &'static [Self];
    /// Human readable list of canonical tokens.
    const EXPECTED: &'static str;
    /// Extra accepted spellings beyond the canonical token and its lowercase form.
    const SYNONYMS: &'static [(&'static str, Self)] = &[];

    /// Returns the canonical remote token.
    fn encode(self) -> &'static str;

    /// Parses a remote token.
    ///
    /// # Errors
    ///
    /// Returns [`EnumError`] for anything other than a canonical token, its
    /// lowercase spelling, or a declared synonym.
    fn decode(raw: &str) -> Result<Self, EnumError> {
        Self::ALL
            .iter()
            .copied()
            .find(|value| matches_token(raw, value.encode()))
            .or_else(|| {
                Self::SYNONYMS
                    .iter()
                    .find(|(token, _)| matches_token(raw, token))
                    .map(|(_, value)| *value)
            })
            .ok_or_else(|| EnumError {
                type_name: Self::NAME,
                value: raw.to_string(),
                expected: Self::EXPECTED,
            })
    }
}

/// Exact uppercase token, or the same token entirely in lowercase.
fn matches_token(raw: &str, canonical: &str) -> bool {
    raw == canonical
        || (raw.len() == canonical.len()
            && raw
                .bytes()
                .zip(canonical.bytes())
                .all(|(r, c)| r == c.to_ascii_lowercase()))
}

/// Normal balance polarity of an account or account set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum DebitOrCredit {
    /// Positive balances are debits.
    Debit,
    /// Positive balances are credits.
    Credit,
}

impl RemoteEnum for DebitOrCredit {
    const NAME: &'static str = "DebitOrCredit";
    const ALL: &'static [Self] = &[Self::Debit, Self::Credit];
    const EXPECTED: &'static str = "DEBIT, CREDIT";

    fn encode(self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }
}

/// Lifecycle status of an account or journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Status {
    /// Open for posting.
    Active,
    /// Closed for posting.
    Inactive,
}

impl RemoteEnum for Status {
    const NAME: &'static str = "Status";
    const ALL: &'static [Self] = &[Self::Active, Self::Inactive];
    const EXPECTED: &'static str = "ACTIVE, INACTIVE";
    // The ledger service reports inactive records as LOCKED.
    const SYNONYMS: &'static [(&'static str, Self)] = &[("LOCKED", Self::Inactive)];

    fn encode(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

macro_rules! remote_enum_conversions {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.encode())
            }
        }

        impl FromStr for $name {
            type Err = EnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::decode(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = EnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::decode(&value)
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.encode()
            }
        }
    };
}

remote_enum_conversions!(DebitOrCredit);
remote_enum_conversions!(Status);
