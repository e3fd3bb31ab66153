//! Create, read and update of schema-driven entities.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use ledgerform_shared::types::EntityId;

use super::kinds::Kind;
use super::record::{Changeset, Desired, Entity};
use crate::cancel::{call, ensure_live};
use crate::client::LedgerClient;
use crate::error::{OpContext, Phase, ReconcileError};

/// Drives one entity's lifecycle against the remote ledger.
///
/// The reconciler holds no state of its own. The mirror returned by each
/// operation is the caller's new local state; on error the caller keeps the
/// previous one.
pub struct EntityReconciler<'a, C: LedgerClient + ?Sized> {
    client: &'a C,
    cancel: CancellationToken,
}

impl<'a, C: LedgerClient + ?Sized> EntityReconciler<'a, C> {
    /// Creates a reconciler bound to a client and a cancellation token.
    #[must_use]
    pub fn new(client: &'a C, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Creates the entity remotely.
    ///
    /// Enum fields are validated before any request is made. The returned
    /// mirror holds the remote's view plus the write-only fields sent.
    ///
    /// # Errors
    ///
    /// Returns a local validation error, or the classified remote failure.
    /// An entity that already exists surfaces as a conflict.
    #[instrument(skip_all, fields(kind = %K::KIND, id = %desired.id()))]
    pub async fn create<K: Kind>(&self, desired: &Desired<K>) -> Result<Entity<K>, ReconcileError> {
        let fields = desired.normalize()?;
        let context = context::<K>(desired.id(), Phase::Create);
        let input = Entity::<K>::create_payload(desired.id(), &fields);

        let response = call(
            &self.cancel,
            &context,
            self.client.create_entity(K::KIND, input),
        )
        .await?;
        let remote = Entity::<K>::from_payload(&response, &context)?;
        ensure_live(&self.cancel, &context)?;

        let mut created = Entity::new(desired.id().clone(), fields);
        created.merge_remote(remote);
        info!(id = %created.id(), "created");
        Ok(created)
    }

    /// Reads the entity. `None` means the remote confirmed it is gone.
    ///
    /// # Errors
    ///
    /// Returns any remote failure other than not-found.
    #[instrument(skip_all, fields(kind = %K::KIND, id = %id))]
    pub async fn read<K: Kind>(&self, id: &K::Id) -> Result<Option<Entity<K>>, ReconcileError> {
        let context = context::<K>(id, Phase::Read);
        match call(
            &self.cancel,
            &context,
            self.client.get_entity(K::KIND, id.as_str().to_string()),
        )
        .await
        {
            Ok(payload) => Entity::from_payload(&payload, &context).map(Some),
            Err(err) if err.is_not_found() => {
                debug!("not found remotely");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Re-reads the entity and merges the remote view into the mirror.
    ///
    /// Returns `None` when the entity no longer exists remotely.
    ///
    /// # Errors
    ///
    /// Returns any remote failure other than not-found. The mirror is
    /// consumed only on success.
    pub async fn refresh<K: Kind>(
        &self,
        mut current: Entity<K>,
    ) -> Result<Option<Entity<K>>, ReconcileError> {
        let Some(remote) = self.read::<K>(current.id()).await? else {
            return Ok(None);
        };
        ensure_live(&self.cancel, &context::<K>(current.id(), Phase::Read))?;
        current.merge_remote(remote);
        Ok(Some(current))
    }

    /// Brings the remote in line with a full desired state.
    ///
    /// Only mutable fields that differ are sent. With nothing to send this is
    /// a read-refresh.
    ///
    /// # Errors
    ///
    /// Returns a local validation error or the classified remote failure. A
    /// vanished entity is an error here, not an absence.
    #[instrument(skip_all, fields(kind = %K::KIND, id = %current.id()))]
    pub async fn update<K: Kind>(
        &self,
        current: &Entity<K>,
        desired: &Desired<K>,
    ) -> Result<Entity<K>, ReconcileError> {
        let fields = desired.normalize()?;
        let changeset = Changeset::between(current, &fields);
        let remote = self.apply(current.id(), &changeset).await?;

        let mut updated = Entity::new(current.id().clone(), fields);
        updated.merge_remote(remote);
        Ok(updated)
    }

    /// Sends exactly the fields present in `delta`.
    ///
    /// Fields that are not mutable are dropped with a warning.
    ///
    /// # Errors
    ///
    /// As for [`EntityReconciler::update`].
    #[instrument(skip_all, fields(kind = %K::KIND, id = %current.id()))]
    pub async fn update_delta<K: Kind>(
        &self,
        current: &Entity<K>,
        delta: &Desired<K>,
    ) -> Result<Entity<K>, ReconcileError> {
        let changeset = Changeset::<K>::from_delta(&delta.normalize_delta()?);
        let remote = self.apply(current.id(), &changeset).await?;

        let mut updated = current.clone();
        updated.merge_remote(remote);
        Ok(updated)
    }

    /// Remote deletion is not offered by the ledger service.
    ///
    /// # Errors
    ///
    /// Always returns [`ReconcileError::Unsupported`].
    pub fn delete<K: Kind>(&self, id: &K::Id) -> Result<(), ReconcileError> {
        Err(ReconcileError::Unsupported {
            context: context::<K>(id, Phase::Delete),
        })
    }

    /// Adopting an existing remote entity is not offered.
    ///
    /// # Errors
    ///
    /// Always returns [`ReconcileError::Unsupported`].
    pub fn import<K: Kind>(&self, id: &K::Id) -> Result<Entity<K>, ReconcileError> {
        Err(ReconcileError::Unsupported {
            context: context::<K>(id, Phase::Import),
        })
    }

    async fn apply<K: Kind>(
        &self,
        id: &K::Id,
        changeset: &Changeset<K>,
    ) -> Result<Entity<K>, ReconcileError> {
        let context = context::<K>(id, Phase::Update);
        let raw_id = id.as_str().to_string();
        let response = if changeset.is_empty() {
            debug!("no changes; refreshing");
            call(&self.cancel, &context, self.client.get_entity(K::KIND, raw_id)).await?
        } else {
            let fields: Vec<_> = changeset.fields().collect();
            info!(?fields, "updating");
            call(
                &self.cancel,
                &context,
                self.client.update_entity(K::KIND, raw_id, changeset.to_payload()),
            )
            .await?
        };
        let remote = Entity::from_payload(&response, &context)?;
        ensure_live(&self.cancel, &context)?;
        Ok(remote)
    }
}

fn context<K: Kind>(id: &K::Id, phase: Phase) -> OpContext {
    OpContext::new(K::KIND.resource(), id.as_str(), phase)
}
