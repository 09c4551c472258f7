//! Best-effort compensating rollback of the last committed plan.
//!
//! Pops the newest stored record, applies whatever inverse mutations
//! exist, and itemizes every part that cannot be reversed. Rollback
//! never emits domain events or telemetry that would look like organic
//! user activity.

use crate::core::{ActorId, InverseMutation, PlanId, WorkspaceId};
use crate::engine::clock::Clock;
use crate::engine::executor::ExecError;
use crate::engine::history::ExecutionHistory;
use crate::engine::planner::Warning;
use crate::store::{CanvasStore, StoreError};

#[derive(Clone, Debug)]
pub struct RollbackOutcome {
    /// None when there was nothing to roll back.
    pub plan_id: Option<PlanId>,
    pub undone: usize,
    pub warnings: Vec<Warning>,
}

pub fn rollback_last<S: CanvasStore + ?Sized>(
    store: &mut S,
    history: &mut ExecutionHistory,
    clock: &Clock,
    workspace: &WorkspaceId,
    actor: &ActorId,
) -> Result<RollbackOutcome, ExecError> {
    // Rollback writes, so it is lock-gated like any other mutation.
    let now = clock.now();
    let lock = store
        .get_lock(workspace)
        .map_err(|err| ExecError::PreconditionFailure {
            reason: err.to_string(),
        })?;
    let held = lock.map(|l| l.held_by(actor, now)).unwrap_or(false);
    if !held {
        return Err(ExecError::LockViolation {
            workspace: workspace.clone(),
            reason: "rollback requires a currently-held canvas lock".into(),
        });
    }

    let Some(record) = history.pop_latest(workspace) else {
        return Ok(RollbackOutcome {
            plan_id: None,
            undone: 0,
            warnings: vec![Warning::NothingToRollBack],
        });
    };

    let mut warnings: Vec<Warning> = record
        .irreversible
        .iter()
        .map(|reason| Warning::NotReversible {
            reason: reason.clone(),
        })
        .collect();

    // Apply inverses newest-first. A row that is already gone is a
    // warning; a backend failure aborts as rollback_failure (partial
    // rollback, surfaced, never silently declared done).
    let mut undone = 0usize;
    for inverse in record.inverse.iter().rev() {
        match apply_inverse(store, inverse) {
            Ok(()) => undone += 1,
            Err(StoreError::NotFound { collection, id }) => {
                warnings.push(Warning::NoEffect {
                    reason: format!("{collection} row {id} was already gone"),
                });
            }
            Err(err) => {
                return Err(ExecError::RollbackFailure {
                    reason: format!("undoing plan {}: {err}", record.plan_id),
                });
            }
        }
    }

    tracing::debug!(plan = %record.plan_id, undone, "rollback applied");
    Ok(RollbackOutcome {
        plan_id: Some(record.plan_id),
        undone,
        warnings,
    })
}

fn apply_inverse<S: CanvasStore + ?Sized>(
    store: &mut S,
    inverse: &InverseMutation,
) -> Result<(), StoreError> {
    match inverse {
        InverseMutation::DeleteContainer { id } => store.delete_container(id),
        InverseMutation::DeletePort { id } => store.delete_port(id),
        InverseMutation::DeleteEdge { id } => store.delete_edge(id),
        InverseMutation::DetachReference { id } => store.delete_reference(id),
    }
}
