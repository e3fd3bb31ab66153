//! Reconciliation error types.
//!
//! Remote failures are classified once by the client adapter into
//! [`ClientError`] and then wrapped with the resource kind, id and phase that
//! failed. Nothing in the core retries; [`ReconcileError::is_retryable`] only
//! tells the caller whether a retry could help.

use std::fmt;

use thiserror::Error;

use crate::enums::EnumError;

/// Coarse error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A local enum field could not be decoded. Never reaches the network.
    InvalidEnumValue,
    /// The remote confirmed the resource is absent.
    NotFound,
    /// The payload was rejected as invalid (including membership cycles).
    Validation,
    /// Concurrent modification or duplicate.
    Conflict,
    /// Network or protocol failure.
    Transport,
    /// The caller cancelled the operation.
    Cancelled,
    /// The operation is deliberately not implemented.
    Unsupported,
}

impl ErrorKind {
    /// Returns the error code for reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidEnumValue => "INVALID_ENUM_VALUE",
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::Transport => "TRANSPORT_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Unsupported => "UNSUPPORTED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a [`LedgerClient`](crate::client::LedgerClient).
///
/// Messages are the remote's own text, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote rejected the input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Concurrent modification.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The resource or membership already exists.
    #[error("already exists: {0}")]
    Duplicate(String),

    /// Network, HTTP or decoding failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) | Self::Duplicate(_) => ErrorKind::Conflict,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Returns the remote message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::Validation(m)
            | Self::Conflict(m)
            | Self::Duplicate(m)
            | Self::Transport(m) => m,
        }
    }

    /// Returns true if repeating the same call could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Transport(_))
    }
}

/// The resource a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Ledger account.
    Account,
    /// Account set.
    AccountSet,
    /// Journal.
    Journal,
    /// BigQuery export integration.
    BigQueryIntegration,
    /// Bitfinex exchange-feed integration.
    BitfinexIntegration,
    /// Account-set membership edge.
    Membership,
    /// Balance sheet composite.
    BalanceSheet,
}

impl ResourceKind {
    /// Returns the snake_case resource name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::AccountSet => "account_set",
            Self::Journal => "journal",
            Self::BigQueryIntegration => "big_query_integration",
            Self::BitfinexIntegration => "bitfinex_integration",
            Self::Membership => "account_set_member",
            Self::BalanceSheet => "balance_sheet",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Create.
    Create,
    /// Read or refresh.
    Read,
    /// Update.
    Update,
    /// Delete.
    Delete,
    /// Import of an existing remote resource.
    Import,
    /// Membership add.
    MembershipAdd,
    /// Membership remove.
    MembershipRemove,
    /// Membership listing.
    MembershipList,
}

impl Phase {
    /// Returns the phase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
            Self::MembershipAdd => "membership-add",
            Self::MembershipRemove => "membership-remove",
            Self::MembershipList => "membership-list",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which resource, which id, which phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpContext {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource id (edge id for memberships, journal id for balance sheets).
    pub id: String,
    /// Phase.
    pub phase: Phase,
}

impl OpContext {
    /// Creates a new context.
    #[must_use]
    pub fn new(kind: ResourceKind, id: impl Into<String>, phase: Phase) -> Self {
        Self {
            kind,
            id: id.into(),
            phase,
        }
    }
}

impl fmt::Display for OpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.phase, self.kind, self.id)
    }
}

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    // ========== Local pre-flight ==========
    /// An enum field held an unrecognized value.
    #[error("{kind} {id}: field {field}: {source}")]
    InvalidEnumValue {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource id.
        id: String,
        /// Offending field.
        field: &'static str,
        /// Decoder error.
        #[source]
        source: EnumError,
    },

    /// A required field is absent from the desired state.
    #[error("{kind} {id}: field {field} is required")]
    MissingField {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource id.
        id: String,
        /// Missing field.
        field: &'static str,
    },

    /// The desired state names a field the schema does not define.
    #[error("{kind} {id}: unknown field {field}")]
    UnknownField {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource id.
        id: String,
        /// The unknown field name.
        field: String,
    },

    /// An account set was asked to contain itself.
    #[error("account set {0} cannot be a member of itself")]
    SelfMembership(String),

    // ========== Remote ==========
    /// The ledger client reported a failure.
    #[error("{context} failed: {source}")]
    Remote {
        /// Where it failed.
        context: OpContext,
        /// Classified remote failure.
        #[source]
        source: ClientError,
    },

    /// The remote answered with data the schema cannot decode.
    #[error("{context} returned malformed data: {detail}")]
    Malformed {
        /// Where it failed.
        context: OpContext,
        /// What was wrong.
        detail: String,
    },

    /// The caller cancelled the operation before it completed.
    #[error("{context} cancelled")]
    Cancelled {
        /// Where it was cancelled.
        context: OpContext,
    },

    /// The operation is intentionally not implemented.
    #[error("{context} is not supported")]
    Unsupported {
        /// The refused operation.
        context: OpContext,
    },

    /// Some edge operations of a membership batch failed; the rest were applied.
    #[error(
        "{} of {attempted} membership operations on account set {container} failed: {}",
        .failures.len(),
        .failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    Membership {
        /// Container account set.
        container: String,
        /// Number of edge operations attempted.
        attempted: usize,
        /// Every individual failure.
        failures: Vec<ReconcileError>,
    },
}

impl ReconcileError {
    /// Wraps a client failure with its context.
    #[must_use]
    pub fn remote(context: OpContext, source: ClientError) -> Self {
        Self::Remote { context, source }
    }

    /// Creates a malformed-response error.
    #[must_use]
    pub fn malformed(context: OpContext, detail: impl Into<String>) -> Self {
        Self::Malformed {
            context,
            detail: detail.into(),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEnumValue { .. } => ErrorKind::InvalidEnumValue,
            Self::MissingField { .. } | Self::UnknownField { .. } | Self::SelfMembership(_) => {
                ErrorKind::Validation
            }
            Self::Remote { source, .. } => source.kind(),
            Self::Malformed { .. } => ErrorKind::Transport,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::Membership { failures, .. } => failures
                .first()
                .map_or(ErrorKind::Transport, ReconcileError::kind),
        }
    }

    /// Returns the error code for reports.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Returns true if repeating the operation could succeed.
    ///
    /// Remote validation failures, such as a rejected membership cycle, are
    /// permanent.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { source, .. } => source.is_retryable(),
            Self::Malformed { .. } => true,
            Self::Membership { failures, .. } => failures.iter().all(Self::is_retryable),
            _ => false,
        }
    }

    /// Returns true if the remote confirmed the resource is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Remote {
                source: ClientError::NotFound(_),
                ..
            }
        )
    }

    /// Returns true if the caller cancelled the operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the failing context, when there is a single one.
    #[must_use]
    pub fn context(&self) -> Option<&OpContext> {
        match self {
            Self::Remote { context, .. }
            | Self::Malformed { context, .. }
            | Self::Cancelled { context }
            | Self::Unsupported { context } => Some(context),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ctx(phase: Phase) -> OpContext {
        OpContext::new(ResourceKind::Account, "acc-1", phase)
    }

    #[rstest]
    #[case(ClientError::NotFound("x".into()), ErrorKind::NotFound)]
    #[case(ClientError::Validation("x".into()), ErrorKind::Validation)]
    #[case(ClientError::Conflict("x".into()), ErrorKind::Conflict)]
    #[case(ClientError::Duplicate("x".into()), ErrorKind::Conflict)]
    #[case(ClientError::Transport("x".into()), ErrorKind::Transport)]
    fn test_remote_kind_follows_client(#[case] source: ClientError, #[case] kind: ErrorKind) {
        let err = ReconcileError::remote(ctx(Phase::Update), source);
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorKind::InvalidEnumValue.as_str(), "INVALID_ENUM_VALUE");
        assert_eq!(
            ReconcileError::Unsupported {
                context: ctx(Phase::Delete)
            }
            .error_code(),
            "UNSUPPORTED"
        );
        assert_eq!(
            ReconcileError::SelfMembership("as-1".into()).error_code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_retryable_errors() {
        let transport = ReconcileError::remote(ctx(Phase::Read), ClientError::Transport("timeout".into()));
        assert!(transport.is_retryable());

        let cycle = ReconcileError::remote(
            ctx(Phase::MembershipAdd),
            ClientError::Validation("cycle detected".into()),
        );
        assert!(!cycle.is_retryable());

        let duplicate = ReconcileError::remote(ctx(Phase::Create), ClientError::Duplicate("exists".into()));
        assert!(!duplicate.is_retryable());
    }

    #[test]
    fn test_error_display_carries_context_and_remote_message() {
        let err = ReconcileError::remote(
            OpContext::new(ResourceKind::Journal, "journal-1", Phase::Update),
            ClientError::NotFound("Journal journal-1 not found".into()),
        );
        assert_eq!(
            err.to_string(),
            "update journal journal-1 failed: not found: Journal journal-1 not found"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_membership_aggregate() {
        let err = ReconcileError::Membership {
            container: "as-1".into(),
            attempted: 3,
            failures: vec![ReconcileError::remote(
                OpContext::new(ResourceKind::Membership, "accountSet/as-1/account/acc-9", Phase::MembershipAdd),
                ClientError::Validation("account does not exist".into()),
            )],
        };
        assert_eq!(
            err.to_string(),
            "1 of 3 membership operations on account set as-1 failed: \
             membership-add account_set_member accountSet/as-1/account/acc-9 failed: \
             validation failed: account does not exist"
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_membership_aggregate_lists_every_remote_message() {
        let edge = |member: &str| {
            OpContext::new(
                ResourceKind::Membership,
                format!("accountSet/as-1/member_account_set/{member}"),
                Phase::MembershipAdd,
            )
        };
        let err = ReconcileError::Membership {
            container: "as-1".into(),
            attempted: 2,
            failures: vec![
                ReconcileError::remote(edge("as-2"), ClientError::Validation("adding as-2 would create a cycle".into())),
                ReconcileError::remote(edge("as-3"), ClientError::Transport("connection reset".into())),
            ],
        };

        let rendered = err.to_string();
        assert!(rendered.contains("accountSet/as-1/member_account_set/as-2"));
        assert!(rendered.contains("adding as-2 would create a cycle"));
        assert!(rendered.contains("connection reset"));
    }
}
