//! The execution engine - the only component permitted to write.
//!
//! State machine: Idle → Validating → Mutating → Committed | Failed.
//! Validation covers the lock gate, the authority boundary and the
//! repair whitelist; mutations then apply strictly in order, stopping
//! on the first failure. Events, telemetry and the rollback record
//! exist only after every mutation succeeded.

use thiserror::Error;

use crate::core::{
    ActorId, Authority, CanvasLock, Mutation, Plan, PlanId, PlannedMutation, Repair, Stamp,
    TargetCollection, WorkspaceId, guard,
};
use crate::core::{DomainEvent, InverseMutation};
use crate::engine::clock::Clock;
use crate::engine::history::{ExecutionHistory, StoredExecutionRecord};
use crate::engine::planner::Warning;
use crate::error::{Effect, Transience};
use crate::store::CanvasStore;
use crate::telemetry::TelemetrySink;

/// The failure taxonomy callers dispatch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    LockViolation,
    PreconditionFailure,
    ValidationFailure,
    MutationFailure,
    ForbiddenOperation,
    ForbiddenRepair,
    SyncFailure,
    RollbackFailure,
    Unknown,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LockViolation => "lock_violation",
            Self::PreconditionFailure => "precondition_failure",
            Self::ValidationFailure => "validation_failure",
            Self::MutationFailure => "mutation_failure",
            Self::ForbiddenOperation => "forbidden_operation",
            Self::ForbiddenRepair => "forbidden_repair",
            Self::SyncFailure => "sync_failure",
            Self::RollbackFailure => "rollback_failure",
            Self::Unknown => "unknown",
        }
    }
}

/// Execution errors, each tagged with a failure kind so callers can
/// distinguish "reacquire the lock and retry" from "this plan is
/// permanently invalid".
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum ExecError {
    #[error("lock violation on {workspace}: {reason}")]
    LockViolation {
        workspace: WorkspaceId,
        reason: String,
    },

    #[error("precondition failed: {reason}")]
    PreconditionFailure { reason: String },

    #[error("plan validation failed: {reason}")]
    ValidationFailure { reason: String },

    #[error("mutation {index} ({op}) failed: {reason}")]
    MutationFailure {
        index: usize,
        op: &'static str,
        reason: String,
    },

    #[error("mutation {index} targets denied collection {collection}")]
    ForbiddenOperation {
        index: usize,
        collection: TargetCollection,
    },

    #[error("mutation {index} requested a repair outside its whitelist")]
    ForbiddenRepair { index: usize, requested: Repair },

    #[error("outbound sync failed at mutation {index}: {reason}")]
    SyncFailure { index: usize, reason: String },

    #[error("rollback failed: {reason}")]
    RollbackFailure { reason: String },

    #[error("unknown execution failure: {reason}")]
    Unknown { reason: String },
}

impl ExecError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::LockViolation { .. } => FailureKind::LockViolation,
            Self::PreconditionFailure { .. } => FailureKind::PreconditionFailure,
            Self::ValidationFailure { .. } => FailureKind::ValidationFailure,
            Self::MutationFailure { .. } => FailureKind::MutationFailure,
            Self::ForbiddenOperation { .. } => FailureKind::ForbiddenOperation,
            Self::ForbiddenRepair { .. } => FailureKind::ForbiddenRepair,
            Self::SyncFailure { .. } => FailureKind::SyncFailure,
            Self::RollbackFailure { .. } => FailureKind::RollbackFailure,
            Self::Unknown { .. } => FailureKind::Unknown,
        }
    }

    pub fn transience(&self) -> Transience {
        match self {
            Self::LockViolation { .. } => Transience::Retryable,
            Self::PreconditionFailure { .. } => Transience::Retryable,
            Self::ValidationFailure { .. }
            | Self::ForbiddenOperation { .. }
            | Self::ForbiddenRepair { .. } => Transience::Permanent,
            Self::MutationFailure { .. }
            | Self::SyncFailure { .. }
            | Self::RollbackFailure { .. }
            | Self::Unknown { .. } => Transience::Unknown,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Self::LockViolation { .. }
            | Self::PreconditionFailure { .. }
            | Self::ValidationFailure { .. }
            | Self::ForbiddenOperation { .. }
            | Self::ForbiddenRepair { .. } => Effect::None,
            Self::MutationFailure { index, .. } | Self::SyncFailure { index, .. } => {
                if *index == 0 {
                    Effect::None
                } else {
                    Effect::Some
                }
            }
            Self::RollbackFailure { .. } | Self::Unknown { .. } => Effect::Unknown,
        }
    }
}

/// What a committed plan reports back.
#[derive(Clone, Debug)]
pub struct ExecOutcome {
    pub plan_id: PlanId,
    pub applied: usize,
    pub events: Vec<DomainEvent>,
    pub warnings: Vec<Warning>,
    pub reversible: bool,
}

/// Per-run working set collected while mutating.
#[derive(Default)]
struct RunLedger {
    inverse: Vec<InverseMutation>,
    irreversible: Vec<String>,
    warnings: Vec<Warning>,
}

pub struct Executor<'a, S: CanvasStore + ?Sized> {
    store: &'a mut S,
    history: &'a mut ExecutionHistory,
    telemetry: Option<&'a dyn TelemetrySink>,
    clock: &'a mut Clock,
    max_mutations_per_plan: usize,
}

impl<'a, S: CanvasStore + ?Sized> Executor<'a, S> {
    pub fn new(
        store: &'a mut S,
        history: &'a mut ExecutionHistory,
        telemetry: Option<&'a dyn TelemetrySink>,
        clock: &'a mut Clock,
        max_mutations_per_plan: usize,
    ) -> Self {
        Self {
            store,
            history,
            telemetry,
            clock,
            max_mutations_per_plan,
        }
    }

    /// Run one plan to commit or first failure.
    pub fn execute(&mut self, plan: Plan, actor: &ActorId) -> Result<ExecOutcome, ExecError> {
        let span = tracing::debug_span!("execute_plan", plan = %plan.id, workspace = %plan.workspace);
        let _guard = span.enter();

        // ---- Validating ----
        self.validate(&plan, actor)?;

        // ---- Mutating ----
        let mut ledger = RunLedger::default();
        let mut applied = 0usize;
        for (index, pm) in plan.mutations.iter().enumerate() {
            self.apply(index, pm, actor, &mut ledger)?;
            applied += 1;
        }

        // ---- Committed ----
        let mut warnings = ledger.warnings;
        for event in &plan.events {
            if let Some(sink) = self.telemetry
                && let Err(err) = sink.record(event)
            {
                tracing::warn!(error = %err, "telemetry forward failed; commit stands");
                warnings.push(Warning::TelemetryDropped {
                    reason: err.to_string(),
                });
            }
        }

        let reversible = ledger.irreversible.is_empty();
        if !plan.is_lock_only() {
            self.history.push(StoredExecutionRecord {
                plan_id: plan.id.clone(),
                workspace: plan.workspace.clone(),
                inverse: ledger.inverse,
                reversible,
                irreversible: ledger.irreversible,
                recorded_at: self.clock.now(),
            });
        }

        tracing::debug!(applied, reversible, "plan committed");
        Ok(ExecOutcome {
            plan_id: plan.id,
            applied,
            events: plan.events,
            warnings,
            reversible,
        })
    }

    fn validate(&mut self, plan: &Plan, actor: &ActorId) -> Result<(), ExecError> {
        if plan.mutations.is_empty() {
            return Err(ExecError::ValidationFailure {
                reason: "plan carries no mutations".into(),
            });
        }
        if plan.mutations.len() > self.max_mutations_per_plan {
            return Err(ExecError::ValidationFailure {
                reason: format!(
                    "plan carries {} mutations (max {})",
                    plan.mutations.len(),
                    self.max_mutations_per_plan
                ),
            });
        }

        // Lock gate. Lock-only plans are exempt: acquisition cannot
        // require the lock it creates.
        if !plan.is_lock_only() {
            self.check_lock(&plan.workspace, actor)?;
        }

        // Authority boundary + repair whitelist.
        for (index, pm) in plan.mutations.iter().enumerate() {
            let collection = pm.op.target();
            if collection.authority() == Authority::Authoritative
                && (!pm.op.is_controlled_exception() || !has_paired_creation(plan, &pm.op))
            {
                return Err(ExecError::ForbiddenOperation { index, collection });
            }
            if let Some(requested) = pm.repair
                && Some(requested) != pm.op.allowed_repair()
            {
                return Err(ExecError::ForbiddenRepair { index, requested });
            }
        }

        // Precondition re-check: plans were generated against a
        // snapshot; minimal re-verification before mutating.
        match self.store.workspace_exists(&plan.workspace) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ExecError::PreconditionFailure {
                reason: format!("workspace {} no longer exists", plan.workspace),
            }),
            Err(err) => Err(ExecError::PreconditionFailure {
                reason: err.to_string(),
            }),
        }
    }

    fn check_lock(&mut self, workspace: &WorkspaceId, actor: &ActorId) -> Result<(), ExecError> {
        let now = self.clock.now();
        let lock = self
            .store
            .get_lock(workspace)
            .map_err(|err| ExecError::PreconditionFailure {
                reason: err.to_string(),
            })?;
        match lock {
            None => Err(ExecError::LockViolation {
                workspace: workspace.clone(),
                reason: "no canvas lock is held".into(),
            }),
            Some(lock) if lock.is_expired(now) => Err(ExecError::LockViolation {
                workspace: workspace.clone(),
                reason: format!("lock held by {} has expired", lock.holder),
            }),
            Some(lock) if &lock.holder != actor => Err(ExecError::LockViolation {
                workspace: workspace.clone(),
                reason: format!("lock is held by {}", lock.holder),
            }),
            Some(_) => Ok(()),
        }
    }

    fn apply(
        &mut self,
        index: usize,
        pm: &PlannedMutation,
        actor: &ActorId,
        ledger: &mut RunLedger,
    ) -> Result<(), ExecError> {
        let op_name = pm.op.kind_str();
        let fail = |reason: String| ExecError::MutationFailure {
            index,
            op: op_name,
            reason,
        };

        match &pm.op {
            Mutation::CreateContainer { container } => {
                let mut row = container.clone();
                if pm.repair == Some(Repair::StampTimestamps) {
                    let stamp = Stamp::new(self.clock.tick(), actor.clone());
                    row.created = stamp.clone();
                    row.updated = stamp;
                }
                let id = row.id.clone();
                self.store
                    .insert_container(row)
                    .map_err(|e| fail(e.to_string()))?;
                ledger.inverse.push(InverseMutation::DeleteContainer { id });
            }
            Mutation::UpdateContainer { id, patch } => {
                let current = self
                    .store
                    .get_container(id)
                    .map_err(|e| fail(e.to_string()))?;
                let Some(mut current) = current else {
                    return Err(fail(format!("container {id} not found")));
                };
                let mut patch = patch.clone();
                if pm.repair == Some(Repair::NormalizeNulls) {
                    patch.normalize_nulls();
                }
                current
                    .apply_patch(&patch, Stamp::new(self.clock.tick(), actor.clone()))
                    .map_err(|e| fail(e.to_string()))?;
                self.store
                    .put_container(current)
                    .map_err(|e| fail(e.to_string()))?;
                ledger.irreversible.push(format!(
                    "update of container {id} is not reversible (no prior-value capture)"
                ));
            }
            Mutation::DeleteContainer { id } => {
                self.store
                    .delete_container(id)
                    .map_err(|e| fail(e.to_string()))?;
                ledger
                    .irreversible
                    .push(format!("deletion of container {id} is not reversible"));
            }
            Mutation::CreatePort { port } => {
                let id = port.id.clone();
                self.store
                    .insert_port(port.clone())
                    .map_err(|e| fail(e.to_string()))?;
                ledger.inverse.push(InverseMutation::DeletePort { id });
            }
            Mutation::DeletePort { id } => {
                self.store.delete_port(id).map_err(|e| fail(e.to_string()))?;
                ledger
                    .irreversible
                    .push(format!("deletion of port {id} is not reversible"));
            }
            Mutation::CreateEdge { edge } => {
                let id = edge.id.clone();
                self.store
                    .insert_edge(edge.clone())
                    .map_err(|e| fail(e.to_string()))?;
                ledger.inverse.push(InverseMutation::DeleteEdge { id });
            }
            Mutation::DeleteEdge { id } => {
                self.store.delete_edge(id).map_err(|e| fail(e.to_string()))?;
                ledger
                    .irreversible
                    .push(format!("deletion of edge {id} is not reversible"));
            }
            Mutation::AttachReference { reference } => {
                let id = reference.id.clone();
                self.store
                    .insert_reference(reference.clone())
                    .map_err(|e| fail(e.to_string()))?;
                ledger.inverse.push(InverseMutation::DetachReference { id });
            }
            Mutation::DetachReference { id } => {
                self.store
                    .delete_reference(id)
                    .map_err(|e| fail(e.to_string()))?;
                ledger
                    .irreversible
                    .push(format!("detaching reference {id} is not reversible"));
            }
            Mutation::PutVisibility { setting } => {
                self.store
                    .put_visibility(setting.clone())
                    .map_err(|e| fail(e.to_string()))?;
                ledger
                    .irreversible
                    .push("visibility update is not reversible".to_string());
            }
            Mutation::AcquireLock { lock } => {
                let now = self.clock.now();
                let current = self
                    .store
                    .get_lock(&lock.workspace)
                    .map_err(|e| fail(e.to_string()))?;
                if let Some(existing) = current
                    && !existing.is_expired(now)
                    && existing.holder != lock.holder
                {
                    return Err(ExecError::LockViolation {
                        workspace: lock.workspace.clone(),
                        reason: format!("lock is held by {}", existing.holder),
                    });
                }
                self.store
                    .put_lock(lock.clone())
                    .map_err(|e| fail(e.to_string()))?;
            }
            Mutation::RenewLock {
                workspace,
                holder,
                expires,
            } => {
                let current = self
                    .store
                    .get_lock(workspace)
                    .map_err(|e| fail(e.to_string()))?;
                match current {
                    None => {
                        return Err(ExecError::LockViolation {
                            workspace: workspace.clone(),
                            reason: "no lock to renew".into(),
                        });
                    }
                    Some(existing) if &existing.holder != holder => {
                        return Err(ExecError::LockViolation {
                            workspace: workspace.clone(),
                            reason: format!("lock is held by {}", existing.holder),
                        });
                    }
                    Some(_) => {
                        // Renewal is idempotent for the current holder.
                        self.store
                            .put_lock(CanvasLock::new(
                                workspace.clone(),
                                holder.clone(),
                                *expires,
                            ))
                            .map_err(|e| fail(e.to_string()))?;
                    }
                }
            }
            Mutation::ReleaseLock { workspace, holder } => {
                let current = self
                    .store
                    .get_lock(workspace)
                    .map_err(|e| fail(e.to_string()))?;
                match current {
                    None => {
                        // Releasing a lock nobody holds is a no-op.
                        ledger.warnings.push(Warning::NoEffect {
                            reason: "no lock to release".into(),
                        });
                    }
                    Some(existing) if &existing.holder != holder => {
                        return Err(ExecError::LockViolation {
                            workspace: workspace.clone(),
                            reason: format!("lock is held by {}", existing.holder),
                        });
                    }
                    Some(_) => {
                        self.store
                            .delete_lock(workspace)
                            .map_err(|e| fail(e.to_string()))?;
                    }
                }
            }
            Mutation::SetLayoutFlag { flag } => {
                self.store
                    .put_layout_flag(flag.clone())
                    .map_err(|e| fail(e.to_string()))?;
            }
            Mutation::CreateAuthoritativeEntity {
                entity,
                title,
                container,
            } => {
                // Outbound guard before touching the authoritative
                // store; a denial degrades to a warning plus no-op.
                let row = self
                    .store
                    .get_container(container)
                    .map_err(|e| fail(e.to_string()))?;
                let decision =
                    guard::classify_outbound(row.as_ref(), container, "create_authoritative_entity");
                if !decision.allowed {
                    let reason = decision.reason.unwrap_or_else(|| "nothing to sync".into());
                    tracing::warn!(%entity, %reason, "outbound sync blocked; skipping");
                    ledger.warnings.push(Warning::NothingToSync { reason });
                    return Ok(());
                }
                self.store
                    .create_authoritative_entity(entity, title)
                    .map_err(|e| ExecError::SyncFailure {
                        index,
                        reason: e.to_string(),
                    })?;
                ledger.irreversible.push(format!(
                    "authoritative entity {entity} persists; its creation is not reversible by this engine"
                ));
            }
            Mutation::LinkAuthoritativeChild { parent, child } => {
                self.store
                    .link_authoritative_child(parent, child)
                    .map_err(|e| ExecError::SyncFailure {
                        index,
                        reason: e.to_string(),
                    })?;
                ledger.irreversible.push(format!(
                    "authoritative link of {child} under {parent} is not reversible"
                ));
            }
        }
        Ok(())
    }
}

/// The pairing rule for the controlled exceptions: the same plan must
/// also create the integrated container and attach its reference.
fn has_paired_creation(plan: &Plan, op: &Mutation) -> bool {
    match op {
        Mutation::CreateAuthoritativeEntity {
            entity, container, ..
        } => {
            let creates = plan.mutations.iter().any(|pm| {
                matches!(
                    &pm.op,
                    Mutation::CreateContainer { container: c }
                        if &c.id == container && c.origin.as_ref() == Some(entity)
                )
            });
            let attaches = plan.mutations.iter().any(|pm| match &pm.op {
                Mutation::AttachReference { reference } => {
                    &reference.container == container && reference.links_entity(entity)
                }
                _ => false,
            });
            creates && attaches
        }
        Mutation::LinkAuthoritativeChild { child, .. } => plan.mutations.iter().any(|pm| {
            matches!(
                &pm.op,
                Mutation::CreateAuthoritativeEntity { entity, .. } if entity == child
            )
        }),
        _ => false,
    }
}
