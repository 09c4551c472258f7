//! Shared plan-generator contract.
//!
//! Both generators are pure with respect to every store: they read the
//! snapshot and the reconciliation map, and emit a plan or an explicit
//! error. `Ok` with `plan: None` is the idempotent/no-op outcome;
//! warnings ride along either way.

use serde::Serialize;
use thiserror::Error;

use crate::core::recon::DuplicateMapping;
use crate::core::{
    ActorId, CanvasState, Container, ContainerId, CoreError, EdgeId, EntityKey, Limits, Plan,
    PortId, ReconciliationMap, WallClock, WorkspaceId,
};
use crate::error::{Effect, Transience};

/// Non-fatal diagnostics surfaced to the caller.
///
/// Sync-guard denials and idempotent skips are expected steady states,
/// represented here rather than as failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Materialization skipped: the entity already has a mirror.
    AlreadyMirrored {
        entity: EntityKey,
        container: ContainerId,
    },
    /// Inbound event for an entity nothing mirrors; deliberate no-op.
    NoMirror { entity: EntityKey, operation: String },
    /// An updated field the canvas does not map yet.
    FieldNotMapped { field: String },
    /// Outbound sync skipped; nothing to sync is a steady state.
    NothingToSync { reason: String },
    /// The intent would not change anything.
    NoEffect { reason: String },
    /// Rollback accounting: this part cannot be reversed.
    NotReversible { reason: String },
    /// Post-commit telemetry forwarding failed; non-fatal.
    TelemetryDropped { reason: String },
    /// Rollback requested with an empty history.
    NothingToRollBack,
}

/// Planning errors: malformed intent, missing entity, violated
/// invariant. Always raised before any I/O.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum PlanError {
    #[error("container not found: {0}")]
    ContainerNotFound(ContainerId),

    #[error("port not found: {0}")]
    PortNotFound(PortId),

    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),

    #[error("container {0} is a read-only ghost")]
    GhostReadOnly(ContainerId),

    #[error("nesting {child} under {parent} would create a cycle")]
    NestCycle {
        child: ContainerId,
        parent: ContainerId,
    },

    #[error("an edge between {a} and {b} already exists")]
    EdgeExists { a: PortId, b: PortId },

    #[error("{what} exceeds max {max} (got {got})")]
    LimitExceeded {
        what: &'static str,
        max: usize,
        got: usize,
    },

    #[error("validation failed for {field}: {reason}")]
    ValidationFailed { field: String, reason: String },

    #[error(transparent)]
    Duplicate(#[from] DuplicateMapping),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PlanError {
    pub fn transience(&self) -> Transience {
        // Plans are rejected before any I/O.
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

/// Generator output: a plan to execute, or a reasoned no-op.
#[derive(Clone, Debug, Default)]
pub struct Planned {
    pub plan: Option<Plan>,
    pub warnings: Vec<Warning>,
}

impl Planned {
    pub fn of(plan: Plan) -> Self {
        Self {
            plan: Some(plan),
            warnings: Vec::new(),
        }
    }

    pub fn noop(warnings: Vec<Warning>) -> Self {
        Self {
            plan: None,
            warnings,
        }
    }
}

/// Everything a generator may read.
pub struct PlanContext<'a> {
    pub workspace: &'a WorkspaceId,
    pub actor: &'a ActorId,
    pub state: &'a CanvasState,
    pub recon: &'a ReconciliationMap,
    pub limits: &'a Limits,
    pub now: WallClock,
}

pub(crate) fn require_container<'a>(
    state: &'a CanvasState,
    id: &ContainerId,
) -> Result<&'a Container, PlanError> {
    state
        .containers
        .get(id)
        .ok_or_else(|| PlanError::ContainerNotFound(id.clone()))
}

pub(crate) fn enforce_text_limit(
    what: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), PlanError> {
    if let Some(v) = value
        && v.len() > max
    {
        return Err(PlanError::LimitExceeded {
            what,
            max,
            got: v.len(),
        });
    }
    Ok(())
}

pub(crate) fn enforce_metadata_limits(
    metadata: &std::collections::BTreeMap<String, String>,
    limits: &Limits,
) -> Result<(), PlanError> {
    if metadata.len() > limits.max_metadata_entries {
        return Err(PlanError::LimitExceeded {
            what: "metadata entries",
            max: limits.max_metadata_entries,
            got: metadata.len(),
        });
    }
    for (key, value) in metadata {
        if key.len() > limits.max_metadata_key_bytes {
            return Err(PlanError::LimitExceeded {
                what: "metadata key bytes",
                max: limits.max_metadata_key_bytes,
                got: key.len(),
            });
        }
        if value.len() > limits.max_metadata_value_bytes {
            return Err(PlanError::LimitExceeded {
                what: "metadata value bytes",
                max: limits.max_metadata_value_bytes,
                got: value.len(),
            });
        }
    }
    Ok(())
}
