//! A full reconciliation pass over a manifest.
//!
//! The pass walks every desired resource in dependency order (journals,
//! accounts, account sets, integrations, memberships, balance sheets) and
//! updates the local [`Mirror`] as each one lands. Independent failures are
//! collected; cancellation stops the walk.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ledgerform_shared::types::{AccountId, AccountSetId, EntityId, IntegrationId, JournalId};

use crate::balance_sheet::{BalanceSheet, BalanceSheetAssembler};
use crate::client::LedgerClient;
use crate::entity::{
    Account, AccountSet, BigQueryIntegration, BitfinexIntegration, Changeset, Desired, Entity,
    EntityReconciler, Journal, Kind,
};
use crate::error::{ReconcileError, ResourceKind};
use crate::membership::{MemberRef, MembershipDiff, MembershipGraph};

/// An account set together with the members it should hold.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSetSpec {
    /// The set itself.
    #[serde(flatten)]
    pub set: Desired<AccountSet>,
    /// Direct members. `None` leaves memberships unmanaged.
    #[serde(default)]
    pub members: Option<Vec<MemberRef>>,
}

/// The desired state of a ledger.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Journals.
    pub journals: Vec<Desired<Journal>>,
    /// Accounts.
    pub accounts: Vec<Desired<Account>>,
    /// Account sets and their members.
    pub account_sets: Vec<AccountSetSpec>,
    /// BigQuery export integrations.
    pub big_query_integrations: Vec<Desired<BigQueryIntegration>>,
    /// Bitfinex exchange-feed integrations.
    pub bitfinex_integrations: Vec<Desired<BitfinexIntegration>>,
    /// Journals that should have a balance sheet.
    pub balance_sheets: Vec<JournalId>,
}

impl Manifest {
    /// Parses a JSON manifest.
    ///
    /// # Errors
    ///
    /// Returns the parse error, including unknown fields and bad enum tokens
    /// caught by the schema.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Last-known remote state, persisted between passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mirror {
    /// Journals.
    pub journals: BTreeMap<JournalId, Entity<Journal>>,
    /// Accounts.
    pub accounts: BTreeMap<AccountId, Entity<Account>>,
    /// Account sets.
    pub account_sets: BTreeMap<AccountSetId, Entity<AccountSet>>,
    /// BigQuery export integrations.
    pub big_query_integrations: BTreeMap<IntegrationId, Entity<BigQueryIntegration>>,
    /// Bitfinex exchange-feed integrations.
    pub bitfinex_integrations: BTreeMap<IntegrationId, Entity<BitfinexIntegration>>,
    /// Last reconciled members of each managed set.
    pub memberships: BTreeMap<AccountSetId, BTreeSet<MemberRef>>,
    /// Balance sheets by journal.
    pub balance_sheets: BTreeMap<JournalId, BalanceSheet>,
}

/// What happened to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Created for the first time.
    Created,
    /// Missing remotely and created again.
    Recreated,
    /// Mutable fields sent.
    Updated,
    /// Already in line; mirror refreshed.
    Unchanged,
    /// Membership edges added and removed.
    MembersChanged {
        /// Edges added.
        added: usize,
        /// Edges removed.
        removed: usize,
    },
}

/// One applied resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource id.
    pub id: String,
    /// What was done.
    pub action: Action,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            Action::Created => write!(f, "created {} {}", self.kind, self.id),
            Action::Recreated => write!(f, "recreated {} {}", self.kind, self.id),
            Action::Updated => write!(f, "updated {} {}", self.kind, self.id),
            Action::Unchanged => write!(f, "unchanged {} {}", self.kind, self.id),
            Action::MembersChanged { added, removed } => {
                write!(f, "account set {}: +{added} -{removed} members", self.id)
            }
        }
    }
}

/// Result of [`ReconcilePass::run`].
#[derive(Debug, Default)]
pub struct PassReport {
    /// Resources handled successfully.
    pub outcomes: Vec<Outcome>,
    /// Failures, in the order they happened.
    pub errors: Vec<ReconcileError>,
}

impl PassReport {
    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if the pass stopped because it was cancelled.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.errors.iter().any(ReconcileError::is_cancelled)
    }

    fn record(&mut self, kind: ResourceKind, id: impl Into<String>, action: Action) {
        self.outcomes.push(Outcome {
            kind,
            id: id.into(),
            action,
        });
    }
}

/// One change a pass would make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedChange {
    /// The resource will be created.
    Create {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource id.
        id: String,
    },
    /// These mutable fields will be sent.
    Update {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource id.
        id: String,
        /// Changed fields.
        fields: Vec<&'static str>,
    },
    /// Membership edges will be added and removed.
    Members {
        /// Container set.
        container: AccountSetId,
        /// Required edge operations.
        diff: MembershipDiff,
    },
}

impl fmt::Display for PlannedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { kind, id } => write!(f, "+ {kind} {id}"),
            Self::Update { kind, id, fields } => write!(f, "~ {kind} {id} ({})", fields.join(", ")),
            Self::Members { container, diff } => {
                write!(f, "~ account set {container} members:")?;
                for member in &diff.to_add {
                    write!(f, " +{member}")?;
                }
                for member in &diff.to_remove {
                    write!(f, " -{member}")?;
                }
                Ok(())
            }
        }
    }
}

/// Result of [`ReconcilePass::plan`].
#[derive(Debug, Default)]
pub struct Plan {
    /// Changes that `run` would make.
    pub changes: Vec<PlannedChange>,
    /// Failures hit while planning, including orphaned mirror entries.
    pub errors: Vec<ReconcileError>,
}

impl Plan {
    /// Returns true if there is nothing to do and nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.errors.is_empty()
    }
}

/// Records a failure; cancellation stops the walk.
fn absorb(errors: &mut Vec<ReconcileError>, err: ReconcileError) -> ControlFlow<()> {
    let cancelled = err.is_cancelled();
    if !cancelled {
        warn!(error = %err, code = err.error_code(), "reconciliation failed");
    }
    errors.push(err);
    if cancelled {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}

/// Drives a manifest against the remote ledger.
pub struct ReconcilePass<'a, C: LedgerClient + ?Sized> {
    entities: EntityReconciler<'a, C>,
    graph: MembershipGraph<'a, C>,
    sheets: BalanceSheetAssembler<'a, C>,
}

impl<'a, C: LedgerClient + ?Sized> ReconcilePass<'a, C> {
    /// Creates a pass over a client.
    #[must_use]
    pub fn new(client: &'a C, cancel: &CancellationToken, page_size: u32) -> Self {
        Self {
            entities: EntityReconciler::new(client, cancel.clone()),
            graph: MembershipGraph::new(client, cancel.clone(), page_size),
            sheets: BalanceSheetAssembler::new(client, cancel.clone()),
        }
    }

    /// Applies the manifest, updating `mirror` as each resource lands.
    pub async fn run(&self, manifest: &Manifest, mirror: &mut Mirror) -> PassReport {
        let mut report = PassReport::default();
        let _ = self.run_inner(manifest, mirror, &mut report).await;
        info!(
            applied = report.outcomes.len(),
            failed = report.errors.len(),
            "reconciliation pass finished"
        );
        report
    }

    async fn run_inner(
        &self,
        manifest: &Manifest,
        mirror: &mut Mirror,
        report: &mut PassReport,
    ) -> ControlFlow<()> {
        self.sync_entities(&manifest.journals, &mut mirror.journals, report)
            .await?;
        self.sync_entities(&manifest.accounts, &mut mirror.accounts, report)
            .await?;
        let sets: Vec<Desired<AccountSet>> =
            manifest.account_sets.iter().map(|spec| spec.set.clone()).collect();
        self.sync_entities(&sets, &mut mirror.account_sets, report)
            .await?;
        self.sync_entities(
            &manifest.big_query_integrations,
            &mut mirror.big_query_integrations,
            report,
        )
        .await?;
        self.sync_entities(
            &manifest.bitfinex_integrations,
            &mut mirror.bitfinex_integrations,
            report,
        )
        .await?;
        self.sync_memberships(&manifest.account_sets, mirror, report)
            .await?;
        self.sync_balance_sheets(&manifest.balance_sheets, &mut mirror.balance_sheets, report)
            .await
    }

    async fn sync_entities<K: Kind>(
        &self,
        desired: &[Desired<K>],
        mirror: &mut BTreeMap<K::Id, Entity<K>>,
        report: &mut PassReport,
    ) -> ControlFlow<()> {
        for want in desired {
            match self.sync_entity(want, mirror.get(want.id())).await {
                Ok((entity, action)) => {
                    report.record(K::KIND.resource(), want.id().as_str(), action);
                    mirror.insert(want.id().clone(), entity);
                }
                Err(err) => absorb(&mut report.errors, err)?,
            }
        }
        self.retain_orphans(desired, mirror, &mut report.errors);
        ControlFlow::Continue(())
    }

    async fn sync_entity<K: Kind>(
        &self,
        want: &Desired<K>,
        known: Option<&Entity<K>>,
    ) -> Result<(Entity<K>, Action), ReconcileError> {
        let Some(known) = known else {
            return Ok((self.entities.create(want).await?, Action::Created));
        };
        let Some(current) = self.entities.refresh(known.clone()).await? else {
            info!(kind = %K::KIND, id = %want.id(), "missing remotely; recreating");
            return Ok((self.entities.create(want).await?, Action::Recreated));
        };
        if Changeset::between(&current, &want.normalize()?).is_empty() {
            return Ok((current, Action::Unchanged));
        }
        Ok((self.entities.update(&current, want).await?, Action::Updated))
    }

    fn retain_orphans<K: Kind>(
        &self,
        desired: &[Desired<K>],
        mirror: &BTreeMap<K::Id, Entity<K>>,
        errors: &mut Vec<ReconcileError>,
    ) {
        let wanted: BTreeSet<&K::Id> = desired.iter().map(Desired::id).collect();
        for id in mirror.keys().filter(|id| !wanted.contains(id)) {
            if let Err(err) = self.entities.delete::<K>(id) {
                warn!(kind = %K::KIND, id = %id, "no longer desired; kept remotely and in the mirror");
                errors.push(err);
            }
        }
    }

    async fn sync_memberships(
        &self,
        specs: &[AccountSetSpec],
        mirror: &mut Mirror,
        report: &mut PassReport,
    ) -> ControlFlow<()> {
        for spec in specs {
            let Some(members) = &spec.members else {
                continue;
            };
            let container = spec.set.id();
            if !mirror.account_sets.contains_key(container) {
                continue;
            }
            match self.graph.reconcile(container, members).await {
                Ok(diff) => {
                    if !diff.is_empty() {
                        report.record(
                            ResourceKind::AccountSet,
                            container.as_str(),
                            Action::MembersChanged {
                                added: diff.to_add.len(),
                                removed: diff.to_remove.len(),
                            },
                        );
                    }
                    mirror
                        .memberships
                        .insert(container.clone(), members.iter().cloned().collect());
                }
                Err(err) => {
                    let cancelled = matches!(
                        &err,
                        ReconcileError::Membership { failures, .. } if failures.iter().any(ReconcileError::is_cancelled)
                    );
                    absorb(&mut report.errors, err)?;
                    if cancelled {
                        return ControlFlow::Break(());
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }

    async fn sync_balance_sheets(
        &self,
        journals: &[JournalId],
        mirror: &mut BTreeMap<JournalId, BalanceSheet>,
        report: &mut PassReport,
    ) -> ControlFlow<()> {
        for journal in journals {
            let result = if let Some(known) = mirror.get(journal) {
                match self.sheets.read(journal).await {
                    Ok(Some(sheet)) => {
                        let action = if sheet == *known {
                            Action::Unchanged
                        } else {
                            Action::Updated
                        };
                        Ok((sheet, action))
                    }
                    Ok(None) => self
                        .sheets
                        .create(journal)
                        .await
                        .map(|sheet| (sheet, Action::Recreated)),
                    Err(err) => Err(err),
                }
            } else {
                self.sheets
                    .create(journal)
                    .await
                    .map(|sheet| (sheet, Action::Created))
            };

            match result {
                Ok((sheet, action)) => {
                    report.record(ResourceKind::BalanceSheet, journal.as_str(), action);
                    mirror.insert(journal.clone(), sheet);
                }
                Err(err) => absorb(&mut report.errors, err)?,
            }
        }

        let wanted: BTreeSet<&JournalId> = journals.iter().collect();
        for journal in mirror.keys().filter(|journal| !wanted.contains(journal)) {
            if let Err(err) = self.sheets.delete(journal) {
                report.errors.push(err);
            }
        }
        ControlFlow::Continue(())
    }

    /// Computes what [`ReconcilePass::run`] would do, issuing reads only.
    pub async fn plan(&self, manifest: &Manifest, mirror: &Mirror) -> Plan {
        let mut plan = Plan::default();
        let _ = self.plan_inner(manifest, mirror, &mut plan).await;
        plan
    }

    async fn plan_inner(&self, manifest: &Manifest, mirror: &Mirror, plan: &mut Plan) -> ControlFlow<()> {
        self.plan_entities(&manifest.journals, &mirror.journals, plan)
            .await?;
        self.plan_entities(&manifest.accounts, &mirror.accounts, plan)
            .await?;
        let sets: Vec<Desired<AccountSet>> =
            manifest.account_sets.iter().map(|spec| spec.set.clone()).collect();
        let existing_sets = self
            .plan_entities(&sets, &mirror.account_sets, plan)
            .await?;
        self.plan_entities(&manifest.big_query_integrations, &mirror.big_query_integrations, plan)
            .await?;
        self.plan_entities(&manifest.bitfinex_integrations, &mirror.bitfinex_integrations, plan)
            .await?;

        for spec in &manifest.account_sets {
            let Some(members) = &spec.members else {
                continue;
            };
            let container = spec.set.id();
            let diff = if existing_sets.contains(container) {
                self.graph.plan(container, members).await
            } else {
                crate::membership::graph::reject_self_loops(container, members)
                    .map(|()| MembershipDiff::compute(members, std::iter::empty()))
            };
            match diff {
                Ok(diff) if diff.is_empty() => {}
                Ok(diff) => plan.changes.push(PlannedChange::Members {
                    container: container.clone(),
                    diff,
                }),
                Err(err) => absorb(&mut plan.errors, err)?,
            }
        }

        for journal in &manifest.balance_sheets {
            let exists = if mirror.balance_sheets.contains_key(journal) {
                match self.sheets.read(journal).await {
                    Ok(found) => found.is_some(),
                    Err(err) => {
                        absorb(&mut plan.errors, err)?;
                        continue;
                    }
                }
            } else {
                false
            };
            if !exists {
                plan.changes.push(PlannedChange::Create {
                    kind: ResourceKind::BalanceSheet,
                    id: journal.to_string(),
                });
            }
        }
        ControlFlow::Continue(())
    }

    /// Plans one kind. Breaks on cancellation, otherwise returns the ids that
    /// exist remotely.
    async fn plan_entities<K: Kind>(
        &self,
        desired: &[Desired<K>],
        mirror: &BTreeMap<K::Id, Entity<K>>,
        plan: &mut Plan,
    ) -> ControlFlow<(), BTreeSet<K::Id>> {
        let mut existing = BTreeSet::new();
        for want in desired {
            let fields = match want.normalize() {
                Ok(fields) => fields,
                Err(err) => {
                    absorb(&mut plan.errors, err)?;
                    continue;
                }
            };
            let current = match mirror.get(want.id()) {
                None => None,
                Some(known) => match self.entities.refresh(known.clone()).await {
                    Ok(current) => current,
                    Err(err) => {
                        absorb(&mut plan.errors, err)?;
                        continue;
                    }
                },
            };
            let kind = K::KIND.resource();
            let id = want.id().to_string();
            match current {
                None => plan.changes.push(PlannedChange::Create { kind, id }),
                Some(current) => {
                    existing.insert(want.id().clone());
                    let changeset = Changeset::between(&current, &fields);
                    if !changeset.is_empty() {
                        plan.changes.push(PlannedChange::Update {
                            kind,
                            id,
                            fields: changeset.fields().collect(),
                        });
                    }
                }
            }
        }
        self.retain_orphans(desired, mirror, &mut plan.errors);
        ControlFlow::Continue(existing)
    }
}
