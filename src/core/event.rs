//! Domain events (outbound) and authoritative change events (inbound).
//!
//! Outbound events are privacy-sensitive by construction: they carry
//! ids, field names and flags, never title/body text. Inbound events
//! are the closed union delivered from the source system's change feed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::container::FieldName;
use super::domain::{EntityType, RelationKind};
use super::identity::{ActorId, ContainerId, EdgeId, EntityId, WorkspaceId};
use super::reference::EntityKey;

/// Emitted only post-commit; forwarded to the telemetry collaborator.
///
/// No free-text content fields: the engine never constructs events
/// containing title or body text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    ContainerCreated {
        workspace: WorkspaceId,
        container: ContainerId,
        integrated: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entity: Option<EntityKey>,
    },
    ContainerUpdated {
        workspace: WorkspaceId,
        container: ContainerId,
        fields: Vec<FieldName>,
    },
    ContainerDeleted {
        workspace: WorkspaceId,
        container: ContainerId,
    },
    GhostActivated {
        workspace: WorkspaceId,
        container: ContainerId,
    },
    EdgeCreated {
        workspace: WorkspaceId,
        edge: EdgeId,
        relation: RelationKind,
        auto_generated: bool,
    },
    EdgeDeleted {
        workspace: WorkspaceId,
        edge: EdgeId,
    },
    ReferenceAttached {
        workspace: WorkspaceId,
        container: ContainerId,
        entity: EntityKey,
    },
    ReferenceDetached {
        workspace: WorkspaceId,
        container: ContainerId,
    },
    LockAcquired {
        workspace: WorkspaceId,
        holder: ActorId,
    },
    LockReleased {
        workspace: WorkspaceId,
        holder: ActorId,
    },
    LayoutReset {
        workspace: WorkspaceId,
    },
    VisibilityChanged {
        workspace: WorkspaceId,
        user: ActorId,
        container: ContainerId,
    },
}

/// Field changes carried by an `EntityUpdated` event.
///
/// Presence means "changed"; fields the planner cannot map yet are
/// surfaced as warnings, never guessed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Parent moves are not mapped to the canvas yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityKey>,
    /// Any other changed fields, by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub other: BTreeMap<String, String>,
}

impl EntityChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.parent.is_none() && self.other.is_empty()
    }
}

/// The closed union of change events from the authoritative domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthoritativeEvent {
    EntityCreated {
        entity_type: EntityType,
        entity_id: EntityId,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<EntityKey>,
    },
    EntityUpdated {
        entity_type: EntityType,
        entity_id: EntityId,
        changes: EntityChanges,
    },
    EntityDeleted {
        entity_type: EntityType,
        entity_id: EntityId,
    },
    SubEntityCreated {
        parent: EntityKey,
        entity_type: EntityType,
        entity_id: EntityId,
        title: String,
    },
}

impl AuthoritativeEvent {
    pub fn entity(&self) -> EntityKey {
        match self {
            Self::EntityCreated {
                entity_type,
                entity_id,
                ..
            }
            | Self::EntityUpdated {
                entity_type,
                entity_id,
                ..
            }
            | Self::EntityDeleted {
                entity_type,
                entity_id,
            }
            | Self::SubEntityCreated {
                entity_type,
                entity_id,
                ..
            } => EntityKey::new(*entity_type, entity_id.clone()),
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::EntityCreated { .. } => "entity_created",
            Self::EntityUpdated { .. } => "entity_updated",
            Self::EntityDeleted { .. } => "entity_deleted",
            Self::SubEntityCreated { .. } => "sub_entity_created",
        }
    }
}
