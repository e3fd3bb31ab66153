//! Desired state, mirrored state and changesets of one entity.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use ledgerform_shared::types::EntityId;

use super::kinds::Kind;
use super::schema::{Access, FieldSpec, FieldValue, Fields};
use crate::client::Payload;
use crate::error::{OpContext, ReconcileError};

/// Key under which serialized records carry their id.
const ID_KEY: &str = "id";

/// Desired state of one entity as written by the caller.
///
/// Values stay raw until [`Desired::normalize`], so a bad enum token is
/// reported before anything reaches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desired<K: Kind> {
    id: K::Id,
    values: BTreeMap<&'static str, String>,
    _kind: PhantomData<K>,
}

impl<K: Kind> Desired<K> {
    /// Creates an empty desired state.
    #[must_use]
    pub fn new(id: K::Id) -> Self {
        Self {
            id,
            values: BTreeMap::new(),
            _kind: PhantomData,
        }
    }

    /// Builds a desired state from `(field, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnknownField`] for a field the caller cannot set.
    pub fn from_pairs<'a>(
        id: K::Id,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ReconcileError> {
        pairs
            .into_iter()
            .try_fold(Self::new(id), |desired, (field, value)| desired.set(field, value))
    }

    /// Sets one field.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnknownField`] if the schema has no such
    /// field, or the field is the identity or server-assigned.
    pub fn set(mut self, field: &str, value: impl Into<String>) -> Result<Self, ReconcileError> {
        let spec = K::schema()
            .field(field)
            .filter(|spec| spec.is_desired())
            .ok_or_else(|| ReconcileError::UnknownField {
                kind: K::KIND.resource(),
                id: self.id.to_string(),
                field: field.to_string(),
            })?;
        self.values.insert(spec.name, value.into());
        Ok(self)
    }

    /// Returns the id.
    #[must_use]
    pub fn id(&self) -> &K::Id {
        &self.id
    }

    /// Returns the raw value of a field, if set.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Decodes every settable field, applying defaults and required checks.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidEnumValue`] or
    /// [`ReconcileError::MissingField`].
    pub fn normalize(&self) -> Result<Fields, ReconcileError> {
        let mut fields = Fields::new();
        for spec in K::schema().attributes().filter(|spec| spec.is_desired()) {
            match self.get(spec.name).or(spec.default) {
                Some(raw) => {
                    fields.insert(spec.name, self.decode(spec, raw)?);
                }
                None if spec.required => {
                    return Err(ReconcileError::MissingField {
                        kind: K::KIND.resource(),
                        id: self.id.to_string(),
                        field: spec.name,
                    });
                }
                None => {}
            }
        }
        Ok(fields)
    }

    /// Decodes only the fields that are set. No defaults, no required checks.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidEnumValue`].
    pub fn normalize_delta(&self) -> Result<Fields, ReconcileError> {
        let schema = K::schema();
        self.values
            .iter()
            .filter_map(|(name, raw)| schema.field(name).map(|spec| (spec, raw)))
            .map(|(spec, raw)| self.decode(spec, raw).map(|value| (spec.name, value)))
            .collect()
    }

    fn decode(&self, spec: &FieldSpec, raw: &str) -> Result<FieldValue, ReconcileError> {
        FieldValue::decode(spec.ty, raw).map_err(|source| ReconcileError::InvalidEnumValue {
            kind: K::KIND.resource(),
            id: self.id.to_string(),
            field: spec.name,
            source,
        })
    }
}

impl<'de, K: Kind> Deserialize<'de> for Desired<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut raw = BTreeMap::<String, Option<String>>::deserialize(deserializer)?;
        let id = raw
            .remove(ID_KEY)
            .flatten()
            .ok_or_else(|| de::Error::missing_field(ID_KEY))?;
        let id = K::Id::parse(id).map_err(de::Error::custom)?;
        raw.into_iter()
            .filter_map(|(field, value)| value.map(|value| (field, value)))
            .try_fold(Self::new(id), |desired, (field, value)| desired.set(&field, value))
            .map_err(de::Error::custom)
    }
}

/// Local mirror of one remote entity.
///
/// Holds what the remote last reported, plus write-only fields the remote
/// never echoes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity<K: Kind> {
    id: K::Id,
    fields: Fields,
    _kind: PhantomData<K>,
}

impl<K: Kind> Entity<K> {
    /// Creates a mirror from decoded fields.
    #[must_use]
    pub fn new(id: K::Id, fields: Fields) -> Self {
        Self {
            id,
            fields,
            _kind: PhantomData,
        }
    }

    /// Returns the id.
    #[must_use]
    pub fn id(&self) -> &K::Id {
        &self.id
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Returns a field's canonical string form.
    #[must_use]
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).map(FieldValue::as_str)
    }

    /// Returns every field.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Decodes a remote payload. Null and absent fields are left unset.
    pub(crate) fn from_payload(payload: &Payload, context: &OpContext) -> Result<Self, ReconcileError> {
        let schema = K::schema();
        let identity = schema.identity();
        let id = match payload.get(identity.wire) {
            Some(Value::String(raw)) => K::Id::parse(raw.as_str())
                .map_err(|err| ReconcileError::malformed(context.clone(), err.to_string()))?,
            _ => {
                return Err(ReconcileError::malformed(
                    context.clone(),
                    format!("missing {}", identity.wire),
                ));
            }
        };

        let mut fields = Fields::new();
        for spec in schema.attributes().filter(|spec| spec.is_readable()) {
            match payload.get(spec.wire) {
                None | Some(Value::Null) => {}
                Some(Value::String(raw)) => {
                    let value = FieldValue::decode(spec.ty, raw)
                        .map_err(|err| ReconcileError::malformed(context.clone(), err.to_string()))?;
                    fields.insert(spec.name, value);
                }
                Some(other) => {
                    return Err(ReconcileError::malformed(
                        context.clone(),
                        format!("{}: expected a string, got {other}", spec.wire),
                    ));
                }
            }
        }
        Ok(Self::new(id, fields))
    }

    /// Adopts the remote's view of every readable field. Write-only fields
    /// keep their local value.
    pub(crate) fn merge_remote(&mut self, remote: Self) {
        let mut fields = remote.fields;
        for spec in K::schema().attributes().filter(|spec| !spec.is_readable()) {
            if let Some(value) = self.fields.remove(spec.name) {
                fields.insert(spec.name, value);
            }
        }
        self.id = remote.id;
        self.fields = fields;
    }

    /// Builds the create input: identity plus every settable field.
    pub(crate) fn create_payload(id: &K::Id, fields: &Fields) -> Payload {
        let schema = K::schema();
        let mut payload = Payload::new();
        payload.insert(
            schema.identity().wire.to_string(),
            Value::String(id.as_str().to_string()),
        );
        for spec in schema.attributes().filter(|spec| spec.is_desired()) {
            if let Some(value) = fields.get(spec.name) {
                payload.insert(spec.wire.to_string(), value.to_json());
            }
        }
        payload
    }
}

impl<K: Kind> Serialize for Entity<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_KEY, self.id.as_str())?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value.as_str())?;
        }
        map.end()
    }
}

impl<'de, K: Kind> Deserialize<'de> for Entity<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        let id = raw
            .remove(ID_KEY)
            .ok_or_else(|| de::Error::missing_field(ID_KEY))?;
        let id = K::Id::parse(id).map_err(de::Error::custom)?;

        let schema = K::schema();
        let mut fields = Fields::new();
        for (name, value) in raw {
            let spec = schema
                .field(&name)
                .filter(|spec| spec.access != Access::Identity)
                .ok_or_else(|| de::Error::custom(format!("unknown {} field {name}", K::KIND)))?;
            let value = FieldValue::decode(spec.ty, &value).map_err(de::Error::custom)?;
            fields.insert(spec.name, value);
        }
        Ok(Self::new(id, fields))
    }
}

/// Mutable fields to send in one update. `None` clears the field remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset<K: Kind> {
    changes: BTreeMap<&'static str, Option<FieldValue>>,
    _kind: PhantomData<K>,
}

impl<K: Kind> Default for Changeset<K> {
    fn default() -> Self {
        Self {
            changes: BTreeMap::new(),
            _kind: PhantomData,
        }
    }
}

impl<K: Kind> Changeset<K> {
    /// Diffs a full desired state against the mirror.
    ///
    /// Only mutable fields are compared. An unset computed field means the
    /// caller has no opinion; an unset optional field means clear it.
    #[must_use]
    pub fn between(current: &Entity<K>, desired: &Fields) -> Self {
        let mut changeset = Self::default();
        for spec in K::schema().attributes() {
            let wanted = desired.get(spec.name);
            let have = current.get(spec.name);
            match spec.access {
                Access::Mutable => {
                    if wanted.is_none() && spec.computed {
                        continue;
                    }
                    if wanted != have {
                        changeset.changes.insert(spec.name, wanted.cloned());
                    }
                }
                Access::CreateOnly => {
                    if let Some(wanted) = wanted.filter(|wanted| Some(*wanted) != have) {
                        warn!(
                            kind = %K::KIND,
                            id = %current.id(),
                            field = spec.name,
                            wanted = %wanted,
                            "field is immutable after create; change ignored"
                        );
                    }
                }
                Access::Identity | Access::WriteOnly | Access::ReadOnly => {}
            }
        }
        changeset
    }

    /// Builds a changeset from exactly the fields the caller changed.
    ///
    /// Fields that are not mutable are dropped with a warning.
    #[must_use]
    pub fn from_delta(delta: &Fields) -> Self {
        let schema = K::schema();
        let mut changeset = Self::default();
        for (name, value) in delta {
            match schema.field(name) {
                Some(spec) if spec.access == Access::Mutable => {
                    changeset.changes.insert(spec.name, Some(value.clone()));
                }
                _ => warn!(kind = %K::KIND, field = name, "field is not updatable; dropped"),
            }
        }
        changeset
    }

    /// Returns true if nothing needs to be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Names of the changed fields.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.changes.keys().copied()
    }

    /// Returns the change for a field: `Some(None)` means clear.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Option<&FieldValue>> {
        self.changes.get(field).map(Option::as_ref)
    }

    /// Builds the update input.
    pub(crate) fn to_payload(&self) -> Payload {
        let schema = K::schema();
        self.changes
            .iter()
            .filter_map(|(name, value)| schema.field(name).map(|spec| (spec, value)))
            .map(|(spec, value)| {
                (
                    spec.wire.to_string(),
                    value.as_ref().map_or(Value::Null, FieldValue::to_json),
                )
            })
            .collect()
    }
}
