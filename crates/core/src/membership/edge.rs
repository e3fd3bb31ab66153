//! Membership edges between account sets and their members.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ledgerform_shared::types::{AccountId, AccountSetId, EntityId, IdError};

/// Path segment naming an account member in an edge id.
const ACCOUNT_SEGMENT: &str = "account";
/// Path segment naming a nested account-set member in an edge id.
const SET_SEGMENT: &str = "member_account_set";
/// Leading path segment of every edge id.
const CONTAINER_SEGMENT: &str = "accountSet";

/// A member of an account set: either an account or another account set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRef {
    /// A ledger account.
    Account(AccountId),
    /// A nested account set.
    AccountSet(AccountSetId),
}

impl MemberRef {
    /// Returns the member's raw id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Account(id) => id.as_str(),
            Self::AccountSet(id) => id.as_str(),
        }
    }

    /// Returns true for a nested account set.
    #[must_use]
    pub const fn is_account_set(&self) -> bool {
        matches!(self, Self::AccountSet(_))
    }

    fn segment(&self) -> &'static str {
        match self {
            Self::Account(_) => ACCOUNT_SEGMENT,
            Self::AccountSet(_) => SET_SEGMENT,
        }
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.segment(), self.id())
    }
}

impl From<AccountId> for MemberRef {
    fn from(id: AccountId) -> Self {
        Self::Account(id)
    }
}

impl From<AccountSetId> for MemberRef {
    fn from(id: AccountSetId) -> Self {
        Self::AccountSet(id)
    }
}

/// Error returned when an edge id cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EdgeIdError {
    /// The id does not have the `accountSet/{set}/{kind}/{member}` shape.
    #[error("invalid membership id '{0}': expected accountSet/<set>/account/<id> or accountSet/<set>/member_account_set/<id>")]
    Shape(String),

    /// One of the embedded ids is invalid.
    #[error("invalid membership id: {0}")]
    Id(#[from] IdError),
}

/// One container-to-member relation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MembershipEdge {
    /// The containing account set.
    pub container: AccountSetId,
    /// The member.
    pub member: MemberRef,
}

impl MembershipEdge {
    /// Creates an edge.
    #[must_use]
    pub fn new(container: AccountSetId, member: impl Into<MemberRef>) -> Self {
        Self {
            container,
            member: member.into(),
        }
    }

    /// Returns the deterministic edge id.
    #[must_use]
    pub fn id(&self) -> String {
        self.to_string()
    }

    /// Returns true if the edge would make a set contain itself.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        matches!(&self.member, MemberRef::AccountSet(member) if *member == self.container)
    }
}

impl fmt::Display for MembershipEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONTAINER_SEGMENT}/{}/{}", self.container, self.member)
    }
}

impl FromStr for MembershipEdge {
    type Err = EdgeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let shape = || EdgeIdError::Shape(s.to_string());
        let parts: Vec<&str> = s.split('/').collect();
        let [CONTAINER_SEGMENT, container, segment, member] = parts.as_slice() else {
            return Err(shape());
        };
        let container = AccountSetId::new(*container)?;
        let member = match *segment {
            ACCOUNT_SEGMENT => MemberRef::Account(AccountId::new(*member)?),
            SET_SEGMENT => MemberRef::AccountSet(AccountSetId::new(*member)?),
            _ => return Err(shape()),
        };
        Ok(Self { container, member })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn set(id: &str) -> AccountSetId {
        AccountSetId::new(id).unwrap()
    }

    #[test]
    fn test_edge_id_format() {
        let edge = MembershipEdge::new(set("as-1"), AccountId::new("acc-1").unwrap());
        assert_eq!(edge.id(), "accountSet/as-1/account/acc-1");

        let nested = MembershipEdge::new(set("as-1"), set("as-2"));
        assert_eq!(nested.id(), "accountSet/as-1/member_account_set/as-2");
    }

    #[test]
    fn test_edge_id_parse() {
        let edge: MembershipEdge = "accountSet/as-1/member_account_set/as-2".parse().unwrap();
        assert_eq!(edge, MembershipEdge::new(set("as-1"), set("as-2")));
    }

    #[rstest]
    #[case("as-1/account/acc-1")]
    #[case("accountSet/as-1/ledger/acc-1")]
    #[case("accountSet/as-1/account")]
    #[case("accountSet/as-1/account/acc-1/extra")]
    #[case("accountSet//account/acc-1")]
    fn test_edge_id_parse_rejects(#[case] raw: &str) {
        assert!(raw.parse::<MembershipEdge>().is_err());
    }

    #[test]
    fn test_self_loop() {
        assert!(MembershipEdge::new(set("as-1"), set("as-1")).is_self_loop());
        assert!(!MembershipEdge::new(set("as-1"), set("as-2")).is_self_loop());
        assert!(!MembershipEdge::new(set("as-1"), AccountId::new("as-1").unwrap()).is_self_loop());
    }

    #[test]
    fn test_member_ref_serde() {
        let member = MemberRef::Account(AccountId::new("acc-1").unwrap());
        assert_eq!(
            serde_json::to_value(&member).unwrap(),
            serde_json::json!({"account": "acc-1"})
        );
        let nested: MemberRef = serde_json::from_value(serde_json::json!({"account_set": "as-2"})).unwrap();
        assert_eq!(nested, MemberRef::AccountSet(set("as-2")));
    }
}
