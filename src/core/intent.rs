//! The closed, versioned union of user intents.
//!
//! Each variant carries only the fields its mutations need. There is no
//! free-form "do whatever" payload, and an unknown tag fails at the
//! serde boundary before planning ever starts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::container::{ContainerPatch, Position, Size};
use super::domain::{EdgeDirection, EntityType, RelationKind};
use super::identity::{ContainerId, EdgeId, PortId};
use super::reference::EntityKey;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserIntent {
    Move {
        container: ContainerId,
        position: Position,
    },
    Resize {
        container: ContainerId,
        size: Size,
    },
    Nest {
        child: ContainerId,
        parent: ContainerId,
    },
    Unnest {
        child: ContainerId,
    },
    ActivateGhost {
        container: ContainerId,
    },
    CreateManualEdge {
        source: PortId,
        target: PortId,
        relation: RelationKind,
        direction: EdgeDirection,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        metadata: BTreeMap<String, String>,
    },
    DeleteEdge {
        edge: EdgeId,
    },
    DeleteObject {
        container: ContainerId,
    },
    ResetLayout,
    AcquireLock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ttl_ms: Option<u64>,
    },
    RenewLock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ttl_ms: Option<u64>,
    },
    ReleaseLock,
    CreateObject {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        position: Position,
        size: Size,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<ContainerId>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        metadata: BTreeMap<String, String>,
    },
    /// Creates the canvas object AND its backing authoritative entity -
    /// the only intent that reaches the controlled exception path.
    CreateIntegratedObject {
        entity_type: EntityType,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        position: Position,
        size: Size,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_entity: Option<EntityKey>,
    },
    UpdateObject {
        container: ContainerId,
        patch: ContainerPatch,
    },
    UpdateMetadata {
        container: ContainerId,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        set: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        remove: Vec<String>,
    },
    SetVisibility {
        container: ContainerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hidden: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        collapsed: Option<bool>,
    },
}

impl UserIntent {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Resize { .. } => "resize",
            Self::Nest { .. } => "nest",
            Self::Unnest { .. } => "unnest",
            Self::ActivateGhost { .. } => "activate_ghost",
            Self::CreateManualEdge { .. } => "create_manual_edge",
            Self::DeleteEdge { .. } => "delete_edge",
            Self::DeleteObject { .. } => "delete_object",
            Self::ResetLayout => "reset_layout",
            Self::AcquireLock { .. } => "acquire_lock",
            Self::RenewLock { .. } => "renew_lock",
            Self::ReleaseLock => "release_lock",
            Self::CreateObject { .. } => "create_object",
            Self::CreateIntegratedObject { .. } => "create_integrated_object",
            Self::UpdateObject { .. } => "update_object",
            Self::UpdateMetadata { .. } => "update_metadata",
            Self::SetVisibility { .. } => "set_visibility",
        }
    }
}
