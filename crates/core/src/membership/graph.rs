//! Reconciliation of account-set membership edges.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use ledgerform_shared::types::{AccountId, AccountSetId, EntityId, Page, PageRequest};

use super::diff::MembershipDiff;
use super::edge::{MemberRef, MembershipEdge};
use crate::cancel::call;
use crate::client::LedgerClient;
use crate::error::{ClientError, OpContext, Phase, ReconcileError, ResourceKind};

/// Maintains the direct members of account sets.
///
/// Edge operations are idempotent: adding an existing edge and removing an
/// absent one both succeed. Cycle detection beyond a set containing itself is
/// left to the remote, which rejects cycles as validation errors.
pub struct MembershipGraph<'a, C: LedgerClient + ?Sized> {
    client: &'a C,
    cancel: CancellationToken,
    page_size: u32,
}

impl<'a, C: LedgerClient + ?Sized> MembershipGraph<'a, C> {
    /// Creates a graph over a client, listing with the given page size.
    #[must_use]
    pub fn new(client: &'a C, cancel: CancellationToken, page_size: u32) -> Self {
        Self {
            client,
            cancel,
            page_size,
        }
    }

    /// Lists every direct member of a set, following all pages.
    ///
    /// # Errors
    ///
    /// Returns the remote failure, or a malformed-response error if the remote
    /// repeats a cursor.
    #[instrument(skip_all, fields(container = %container))]
    pub async fn members(&self, container: &AccountSetId) -> Result<Vec<MemberRef>, ReconcileError> {
        let context = list_context(container.as_str());
        self.collect_pages(&context, |page| {
            self.client.list_set_members(container.clone(), page)
        })
        .await
    }

    /// Lists every set an account directly belongs to.
    ///
    /// # Errors
    ///
    /// As for [`MembershipGraph::members`].
    #[instrument(skip_all, fields(account = %account))]
    pub async fn memberships_of(&self, account: &AccountId) -> Result<Vec<AccountSetId>, ReconcileError> {
        let context = list_context(account.as_str());
        self.collect_pages(&context, |page| {
            self.client.list_account_memberships(account.clone(), page)
        })
        .await
    }

    /// Returns true if the edge exists remotely.
    ///
    /// # Errors
    ///
    /// As for [`MembershipGraph::members`].
    pub async fn contains(&self, edge: &MembershipEdge) -> Result<bool, ReconcileError> {
        Ok(self.members(&edge.container).await?.contains(&edge.member))
    }

    /// Computes the edge operations needed to reach `desired`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::SelfMembership`] before listing if the set
    /// is asked to contain itself, otherwise any listing failure.
    pub async fn plan(
        &self,
        container: &AccountSetId,
        desired: &[MemberRef],
    ) -> Result<MembershipDiff, ReconcileError> {
        reject_self_loops(container, desired)?;
        let current = self.members(container).await?;
        Ok(MembershipDiff::compute(desired, &current))
    }

    /// Makes the set's direct members exactly `desired`.
    ///
    /// Additions are issued before removals, one at a time. A failing edge
    /// does not stop the others; every failure is reported together. On
    /// cancellation no further edges are attempted.
    ///
    /// # Errors
    ///
    /// Returns a planning failure, or [`ReconcileError::Membership`] listing
    /// each failed edge.
    #[instrument(skip_all, fields(container = %container))]
    pub async fn reconcile(
        &self,
        container: &AccountSetId,
        desired: &[MemberRef],
    ) -> Result<MembershipDiff, ReconcileError> {
        let diff = self.plan(container, desired).await?;
        if diff.is_empty() {
            debug!("memberships up to date");
            return Ok(diff);
        }

        let mut failures = Vec::new();
        let operations = diff
            .to_add
            .iter()
            .map(|member| (true, member))
            .chain(diff.to_remove.iter().map(|member| (false, member)));

        for (adding, member) in operations {
            let edge = MembershipEdge::new(container.clone(), member.clone());
            let result = if adding {
                self.add(&edge).await
            } else {
                self.remove(&edge).await
            };
            match result {
                Ok(()) => {}
                Err(err) if err.is_cancelled() => {
                    failures.push(err);
                    break;
                }
                Err(err) => {
                    warn!(edge = %edge, error = %err, "membership change failed");
                    failures.push(err);
                }
            }
        }

        if failures.is_empty() {
            info!(
                added = diff.to_add.len(),
                removed = diff.to_remove.len(),
                "memberships reconciled"
            );
            Ok(diff)
        } else {
            Err(ReconcileError::Membership {
                container: container.to_string(),
                attempted: diff.operations(),
                failures,
            })
        }
    }

    /// Adds one edge. An edge that already exists counts as success.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::SelfMembership`] for a self loop, otherwise
    /// the classified remote failure.
    #[instrument(skip_all, fields(edge = %edge))]
    pub async fn add(&self, edge: &MembershipEdge) -> Result<(), ReconcileError> {
        if edge.is_self_loop() {
            return Err(ReconcileError::SelfMembership(edge.container.to_string()));
        }
        let context = edge_context(edge, Phase::MembershipAdd);
        match call(
            &self.cancel,
            &context,
            self.client
                .add_member(edge.container.clone(), edge.member.clone()),
        )
        .await
        {
            Ok(()) => {
                info!("member added");
                Ok(())
            }
            Err(ReconcileError::Remote {
                source: ClientError::Duplicate(_),
                ..
            }) => {
                debug!("member already present");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Removes one edge. An edge that is already gone counts as success.
    ///
    /// # Errors
    ///
    /// Returns the classified remote failure.
    #[instrument(skip_all, fields(edge = %edge))]
    pub async fn remove(&self, edge: &MembershipEdge) -> Result<(), ReconcileError> {
        let context = edge_context(edge, Phase::MembershipRemove);
        match call(
            &self.cancel,
            &context,
            self.client
                .remove_member(edge.container.clone(), edge.member.clone()),
        )
        .await
        {
            Ok(()) => {
                info!("member removed");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!("member already absent");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn collect_pages<T, F, Fut>(
        &self,
        context: &OpContext,
        mut fetch: F,
    ) -> Result<Vec<T>, ReconcileError>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, ClientError>>,
    {
        let mut items = Vec::new();
        let mut seen = BTreeSet::new();
        let mut request = PageRequest::first(self.page_size);
        loop {
            let page = call(&self.cancel, context, fetch(request.clone())).await?;
            items.extend(page.items);
            match page.next_cursor {
                Some(cursor) if !seen.insert(cursor.clone()) => {
                    return Err(ReconcileError::malformed(
                        context.clone(),
                        format!("cursor {cursor} repeated"),
                    ));
                }
                Some(cursor) => request = request.next(cursor),
                None => return Ok(items),
            }
        }
    }
}

pub(crate) fn reject_self_loops(container: &AccountSetId, desired: &[MemberRef]) -> Result<(), ReconcileError> {
    if desired
        .iter()
        .any(|member| matches!(member, MemberRef::AccountSet(id) if id == container))
    {
        return Err(ReconcileError::SelfMembership(container.to_string()));
    }
    Ok(())
}

fn edge_context(edge: &MembershipEdge, phase: Phase) -> OpContext {
    OpContext::new(ResourceKind::Membership, edge.id(), phase)
}

fn list_context(id: &str) -> OpContext {
    OpContext::new(ResourceKind::Membership, id, Phase::MembershipList)
}
