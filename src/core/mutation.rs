//! The closed set of write operations a plan may carry.
//!
//! Every variant targets exactly one collection; the mapping is
//! exhaustive so a new mutation kind cannot compile without an
//! authority classification. The two `*Authoritative*` variants are the
//! controlled exceptions - the only writers of the source domain, valid
//! only when paired with an integrated-object creation in the same plan.

use serde::{Deserialize, Serialize};

use super::collection::TargetCollection;
use super::container::{Container, ContainerPatch};
use super::edge::RelationshipEdge;
use super::identity::{ActorId, ContainerId, EdgeId, PortId, ReferenceId, WorkspaceId};
use super::layout_flag::LayoutFlag;
use super::lock::CanvasLock;
use super::port::Port;
use super::reference::{EntityKey, Reference};
use super::time::WallClock;
use super::visibility::VisibilitySetting;

/// The whitelisted per-mutation repairs.
///
/// Anything else a caller asks for is a hard `forbidden_repair`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repair {
    /// Stamp created/updated on a fresh container.
    StampTimestamps,
    /// Rewrite whitespace-only Set patches into Clear.
    NormalizeNulls,
}

/// A single typed write against one collection.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    CreateContainer {
        container: Container,
    },
    UpdateContainer {
        id: ContainerId,
        patch: ContainerPatch,
    },
    DeleteContainer {
        id: ContainerId,
    },
    CreatePort {
        port: Port,
    },
    DeletePort {
        id: PortId,
    },
    CreateEdge {
        edge: RelationshipEdge,
    },
    DeleteEdge {
        id: EdgeId,
    },
    AttachReference {
        reference: Reference,
    },
    DetachReference {
        id: ReferenceId,
    },
    PutVisibility {
        setting: VisibilitySetting,
    },
    AcquireLock {
        lock: CanvasLock,
    },
    RenewLock {
        workspace: WorkspaceId,
        holder: ActorId,
        expires: WallClock,
    },
    ReleaseLock {
        workspace: WorkspaceId,
        holder: ActorId,
    },
    SetLayoutFlag {
        flag: LayoutFlag,
    },
    /// Controlled exception #1: create the backing entity row.
    CreateAuthoritativeEntity {
        entity: EntityKey,
        title: String,
        container: ContainerId,
    },
    /// Controlled exception #2: register the new entity under its
    /// authoritative parent.
    LinkAuthoritativeChild {
        parent: EntityKey,
        child: EntityKey,
    },
}

impl Mutation {
    /// The collection this mutation writes. Exhaustive by construction.
    pub fn target(&self) -> TargetCollection {
        match self {
            Mutation::CreateContainer { .. }
            | Mutation::UpdateContainer { .. }
            | Mutation::DeleteContainer { .. } => TargetCollection::Containers,
            Mutation::CreatePort { .. } | Mutation::DeletePort { .. } => TargetCollection::Ports,
            Mutation::CreateEdge { .. } | Mutation::DeleteEdge { .. } => TargetCollection::Edges,
            Mutation::AttachReference { .. } | Mutation::DetachReference { .. } => {
                TargetCollection::References
            }
            Mutation::PutVisibility { .. } => TargetCollection::VisibilitySettings,
            Mutation::AcquireLock { .. }
            | Mutation::RenewLock { .. }
            | Mutation::ReleaseLock { .. } => TargetCollection::CanvasLocks,
            Mutation::SetLayoutFlag { .. } => TargetCollection::LayoutFlags,
            Mutation::CreateAuthoritativeEntity { entity, .. } => entity.entity_type.collection(),
            Mutation::LinkAuthoritativeChild { child, .. } => child.entity_type.collection(),
        }
    }

    /// Is this one of the two controlled-exception kinds?
    pub fn is_controlled_exception(&self) -> bool {
        matches!(
            self,
            Mutation::CreateAuthoritativeEntity { .. } | Mutation::LinkAuthoritativeChild { .. }
        )
    }

    /// The one repair this mutation kind may carry, if any.
    pub fn allowed_repair(&self) -> Option<Repair> {
        match self {
            Mutation::CreateContainer { .. } => Some(Repair::StampTimestamps),
            Mutation::UpdateContainer { .. } => Some(Repair::NormalizeNulls),
            _ => None,
        }
    }

    /// Short tag for diagnostics and logs.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Mutation::CreateContainer { .. } => "create_container",
            Mutation::UpdateContainer { .. } => "update_container",
            Mutation::DeleteContainer { .. } => "delete_container",
            Mutation::CreatePort { .. } => "create_port",
            Mutation::DeletePort { .. } => "delete_port",
            Mutation::CreateEdge { .. } => "create_edge",
            Mutation::DeleteEdge { .. } => "delete_edge",
            Mutation::AttachReference { .. } => "attach_reference",
            Mutation::DetachReference { .. } => "detach_reference",
            Mutation::PutVisibility { .. } => "put_visibility",
            Mutation::AcquireLock { .. } => "acquire_lock",
            Mutation::RenewLock { .. } => "renew_lock",
            Mutation::ReleaseLock { .. } => "release_lock",
            Mutation::SetLayoutFlag { .. } => "set_layout_flag",
            Mutation::CreateAuthoritativeEntity { .. } => "create_authoritative_entity",
            Mutation::LinkAuthoritativeChild { .. } => "link_authoritative_child",
        }
    }
}

/// A mutation plus the repair the planner asked for.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedMutation {
    pub op: Mutation,
    pub repair: Option<Repair>,
}

impl PlannedMutation {
    /// No repair requested.
    pub fn bare(op: Mutation) -> Self {
        Self { op, repair: None }
    }

    /// Request the op's own whitelisted repair.
    pub fn repaired(op: Mutation) -> Self {
        let repair = op.allowed_repair();
        Self { op, repair }
    }
}

/// Best-effort inverse recorded per applied mutation.
///
/// Only creations are reversible; everything else is accounted for as
/// an irreversible reason on the stored record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InverseMutation {
    DeleteContainer { id: ContainerId },
    DeletePort { id: PortId },
    DeleteEdge { id: EdgeId },
    DetachReference { id: ReferenceId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collection::Authority;
    use crate::core::domain::EntityType;
    use crate::core::identity::EntityId;

    #[test]
    fn controlled_exceptions_target_denied_collections() {
        let entity = EntityKey::new(EntityType::Task, EntityId::new("t9").unwrap());
        let m = Mutation::CreateAuthoritativeEntity {
            entity,
            title: "New task".into(),
            container: ContainerId::generate(),
        };
        assert!(m.is_controlled_exception());
        assert_eq!(m.target().authority(), Authority::Authoritative);
    }

    #[test]
    fn repair_whitelist_is_per_kind() {
        let m = Mutation::DeleteContainer {
            id: ContainerId::generate(),
        };
        assert_eq!(m.allowed_repair(), None);
    }
}
