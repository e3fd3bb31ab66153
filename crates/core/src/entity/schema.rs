//! Field schemas for ledger entity kinds.
//!
//! Every entity kind is described by a static table of [`FieldSpec`]s. The
//! reconciler never names a field directly; it asks the schema which fields
//! are settable, which are computed by the server and which are write-only.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::enums::{DebitOrCredit, EnumError, RemoteEnum, Status};
use crate::error::ResourceKind;

/// Entity kinds driven through create/read/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
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
}

impl EntityKind {
    /// Every entity kind.
    pub const ALL: [Self; 5] = [
        Self::Account,
        Self::AccountSet,
        Self::Journal,
        Self::BigQueryIntegration,
        Self::BitfinexIntegration,
    ];

    /// Returns the field schema of this kind.
    #[must_use]
    pub fn schema(self) -> &'static Schema {
        match self {
            Self::Account => &super::kinds::ACCOUNT_SCHEMA,
            Self::AccountSet => &super::kinds::ACCOUNT_SET_SCHEMA,
            Self::Journal => &super::kinds::JOURNAL_SCHEMA,
            Self::BigQueryIntegration => &super::kinds::BIG_QUERY_SCHEMA,
            Self::BitfinexIntegration => &super::kinds::BITFINEX_SCHEMA,
        }
    }

    /// Returns the matching resource kind for error context.
    #[must_use]
    pub const fn resource(self) -> ResourceKind {
        match self {
            Self::Account => ResourceKind::Account,
            Self::AccountSet => ResourceKind::AccountSet,
            Self::Journal => ResourceKind::Journal,
            Self::BigQueryIntegration => ResourceKind::BigQueryIntegration,
            Self::BitfinexIntegration => ResourceKind::BitfinexIntegration,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.resource(), f)
    }
}

/// Value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Free text.
    Text,
    /// `DEBIT` / `CREDIT`.
    Balance,
    /// `ACTIVE` / `INACTIVE`.
    Status,
}

/// Who may write a field, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The entity id. Sent on create only; never part of an update.
    Identity,
    /// Sent on create; immutable afterwards.
    CreateOnly,
    /// Sent on create and settable by update.
    Mutable,
    /// Sent on create; never read back and never diffed (credentials).
    WriteOnly,
    /// Assigned by the server; never sent.
    ReadOnly,
}

/// Description of one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Local snake_case name.
    pub name: &'static str,
    /// Remote camelCase name.
    pub wire: &'static str,
    /// Value type.
    pub ty: FieldType,
    /// Write access.
    pub access: Access,
    /// Must be present in desired state (after defaults).
    pub required: bool,
    /// Remote is authoritative once it has answered; an unset desired value
    /// means "no opinion" rather than "clear".
    pub computed: bool,
    /// Value sent on create when the caller leaves the field unset.
    pub default: Option<&'static str>,
}

impl FieldSpec {
    const fn new(name: &'static str, wire: &'static str, ty: FieldType, access: Access) -> Self {
        Self {
            name,
            wire,
            ty,
            access,
            required: false,
            computed: false,
            default: None,
        }
    }

    pub(crate) const fn identity(name: &'static str, wire: &'static str) -> Self {
        Self::new(name, wire, FieldType::Text, Access::Identity).required()
    }

    pub(crate) const fn text(name: &'static str, wire: &'static str, access: Access) -> Self {
        Self::new(name, wire, FieldType::Text, access)
    }

    pub(crate) const fn balance(name: &'static str, wire: &'static str, access: Access) -> Self {
        Self::new(name, wire, FieldType::Balance, access)
    }

    pub(crate) const fn status(name: &'static str, wire: &'static str, access: Access) -> Self {
        Self::new(name, wire, FieldType::Status, access)
    }

    pub(crate) const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub(crate) const fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub(crate) const fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self.computed = true;
        self
    }

    /// Returns true if the caller may supply this field in desired state.
    #[must_use]
    pub const fn is_desired(&self) -> bool {
        matches!(
            self.access,
            Access::CreateOnly | Access::Mutable | Access::WriteOnly
        )
    }

    /// Returns true if the remote reports this field back.
    #[must_use]
    pub const fn is_readable(&self) -> bool {
        !matches!(self.access, Access::WriteOnly)
    }
}

/// The field table of one entity kind.
#[derive(Debug)]
pub struct Schema {
    /// Kind described.
    pub kind: EntityKind,
    /// Fields, identity first.
    pub fields: &'static [FieldSpec],
}

impl Schema {
    /// Returns the identity field.
    #[must_use]
    pub fn identity(&self) -> &'static FieldSpec {
        self.fields
            .iter()
            .find(|f| f.access == Access::Identity)
            .unwrap_or(&self.fields[0])
    }

    /// Looks up a field by local name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields other than the identity.
    pub fn attributes(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| f.access != Access::Identity)
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// Balance direction.
    Balance(DebitOrCredit),
    /// Status.
    Status(Status),
}

impl FieldValue {
    /// Decodes a raw string according to the field type.
    ///
    /// # Errors
    ///
    /// Returns [`EnumError`] when an enum field holds an unknown token.
    pub fn decode(ty: FieldType, raw: &str) -> Result<Self, EnumError> {
        Ok(match ty {
            FieldType::Text => Self::Text(raw.to_string()),
            FieldType::Balance => Self::Balance(DebitOrCredit::decode(raw)?),
            FieldType::Status => Self::Status(Status::decode(raw)?),
        })
    }

    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Balance(balance) => balance.encode(),
            Self::Status(status) => status.encode(),
        }
    }

    /// Returns the JSON form sent to the remote.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::String(self.as_str().to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded attribute values keyed by local field name. Absent means unset.
pub type Fields = BTreeMap<&'static str, FieldValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_schema_has_one_identity_first() {
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            assert_eq!(schema.kind, kind);
            assert_eq!(schema.fields[0].access, Access::Identity);
            assert_eq!(
                schema.fields.iter().filter(|f| f.access == Access::Identity).count(),
                1
            );
        }
    }

    #[test]
    fn test_field_names_are_unique() {
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            for (i, a) in schema.fields.iter().enumerate() {
                for b in &schema.fields[i + 1..] {
                    assert_ne!(a.name, b.name, "{kind}: duplicate name");
                    assert_ne!(a.wire, b.wire, "{kind}: duplicate wire name");
                }
            }
        }
    }

    #[test]
    fn test_defaults_decode() {
        for kind in EntityKind::ALL {
            for field in kind.schema().fields {
                if let Some(default) = field.default {
                    assert!(FieldValue::decode(field.ty, default).is_ok());
                }
            }
        }
    }

    #[test]
    fn test_field_value_decode() {
        assert_eq!(
            FieldValue::decode(FieldType::Balance, "debit"),
            Ok(FieldValue::Balance(DebitOrCredit::Debit))
        );
        assert_eq!(
            FieldValue::decode(FieldType::Text, "Cash").unwrap().to_json(),
            Value::String("Cash".to_string())
        );
        assert!(FieldValue::decode(FieldType::Status, "OPEN").is_err());
    }
}
