//! The persistence seam.
//!
//! The hosted data store is a transactional key/row store reachable by
//! simple CRUD calls with no multi-statement transaction guarantee.
//! `CanvasStore` models exactly that: one row per call, ordering left
//! to the caller. `MemoryStore` is the in-process reference
//! implementation used by the test suite.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::core::{
    CanvasLock, CanvasState, Container, ContainerId, EdgeId, EntityKey, LayoutFlag, Port, PortId,
    Reference, ReferenceId, RelationshipEdge, TargetCollection, VisibilitySetting, WorkspaceId,
};
use crate::error::{Effect, Transience};

/// Store-level failures. Single-row semantics, so every failure names
/// its collection and row.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum StoreError {
    #[error("{collection} row not found: {id}")]
    NotFound {
        collection: TargetCollection,
        id: String,
    },

    #[error("{collection} row already exists: {id}")]
    AlreadyExists {
        collection: TargetCollection,
        id: String,
    },

    #[error("unknown workspace: {0}")]
    UnknownWorkspace(WorkspaceId),

    #[error("store backend error: {reason}")]
    Backend { reason: String },
}

impl StoreError {
    pub fn transience(&self) -> Transience {
        match self {
            StoreError::Backend { .. } => Transience::Retryable,
            StoreError::NotFound { .. }
            | StoreError::AlreadyExists { .. }
            | StoreError::UnknownWorkspace(_) => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            StoreError::Backend { .. } => Effect::Unknown,
            _ => Effect::None,
        }
    }
}

/// CRUD over the allow-listed collections, plus the two
/// controlled-exception writes into the authoritative domain. The
/// execution engine is the only caller of the mutating methods.
pub trait CanvasStore {
    fn workspace_exists(&self, workspace: &WorkspaceId) -> Result<bool, StoreError>;

    /// Assemble the read snapshot plan generators work against.
    fn snapshot(&self, workspace: &WorkspaceId) -> Result<CanvasState, StoreError>;

    fn get_container(&self, id: &ContainerId) -> Result<Option<Container>, StoreError>;
    fn insert_container(&mut self, container: Container) -> Result<(), StoreError>;
    fn put_container(&mut self, container: Container) -> Result<(), StoreError>;
    fn delete_container(&mut self, id: &ContainerId) -> Result<(), StoreError>;

    fn insert_port(&mut self, port: Port) -> Result<(), StoreError>;
    fn delete_port(&mut self, id: &PortId) -> Result<(), StoreError>;

    fn insert_edge(&mut self, edge: RelationshipEdge) -> Result<(), StoreError>;
    fn delete_edge(&mut self, id: &EdgeId) -> Result<(), StoreError>;

    fn insert_reference(&mut self, reference: Reference) -> Result<(), StoreError>;
    fn delete_reference(&mut self, id: &ReferenceId) -> Result<(), StoreError>;

    fn put_visibility(&mut self, setting: VisibilitySetting) -> Result<(), StoreError>;

    fn get_lock(&self, workspace: &WorkspaceId) -> Result<Option<CanvasLock>, StoreError>;
    fn put_lock(&mut self, lock: CanvasLock) -> Result<(), StoreError>;
    fn delete_lock(&mut self, workspace: &WorkspaceId) -> Result<(), StoreError>;

    fn get_layout_flag(&self, workspace: &WorkspaceId) -> Result<Option<LayoutFlag>, StoreError>;
    fn put_layout_flag(&mut self, flag: LayoutFlag) -> Result<(), StoreError>;

    /// Controlled exception #1. Reached only through a validated plan
    /// that pairs it with an integrated-object creation.
    fn create_authoritative_entity(
        &mut self,
        entity: &EntityKey,
        title: &str,
    ) -> Result<(), StoreError>;

    /// Controlled exception #2.
    fn link_authoritative_child(
        &mut self,
        parent: &EntityKey,
        child: &EntityKey,
    ) -> Result<(), StoreError>;
}

/// A created-by-us authoritative row, kept so tests can observe the
/// controlled-exception writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthoritativeRow {
    pub title: String,
    pub parent: Option<EntityKey>,
}

/// BTreeMap-backed store. Ids are globally unique, so rows are keyed by
/// id and snapshots filter by workspace.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    workspaces: BTreeSet<WorkspaceId>,
    containers: BTreeMap<ContainerId, Container>,
    ports: BTreeMap<PortId, Port>,
    edges: BTreeMap<EdgeId, RelationshipEdge>,
    references: BTreeMap<ReferenceId, Reference>,
    visibility: BTreeMap<(WorkspaceId, String, ContainerId), VisibilitySetting>,
    locks: BTreeMap<WorkspaceId, CanvasLock>,
    layout_flags: BTreeMap<WorkspaceId, LayoutFlag>,
    authoritative: BTreeMap<EntityKey, AuthoritativeRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workspace (test setup; real deployments inherit the
    /// hosting app's workspace table).
    pub fn create_workspace(&mut self, workspace: WorkspaceId) {
        self.workspaces.insert(workspace);
    }

    /// Observe controlled-exception writes.
    pub fn authoritative_entities(&self) -> impl Iterator<Item = (&EntityKey, &AuthoritativeRow)> {
        self.authoritative.iter()
    }

    /// Seed an authoritative row directly (simulating the source
    /// system) without going through the engine.
    pub fn seed_authoritative_entity(&mut self, entity: EntityKey, row: AuthoritativeRow) {
        self.authoritative.insert(entity, row);
    }
}

impl CanvasStore for MemoryStore {
    fn workspace_exists(&self, workspace: &WorkspaceId) -> Result<bool, StoreError> {
        Ok(self.workspaces.contains(workspace))
    }

    fn snapshot(&self, workspace: &WorkspaceId) -> Result<CanvasState, StoreError> {
        if !self.workspaces.contains(workspace) {
            return Err(StoreError::UnknownWorkspace(workspace.clone()));
        }
        let mut state = CanvasState::default();
        for container in self.containers.values() {
            if &container.workspace == workspace {
                state.containers.upsert(container.clone());
            }
        }
        for port in self.ports.values() {
            if &port.workspace == workspace {
                state.ports.upsert(port.clone());
            }
        }
        for edge in self.edges.values() {
            if &edge.workspace == workspace {
                state.edges.upsert(edge.clone());
            }
        }
        for reference in self.references.values() {
            if &reference.workspace == workspace {
                state.references.upsert(reference.clone());
            }
        }
        for setting in self.visibility.values() {
            if &setting.workspace == workspace {
                state.visibility.push(setting.clone());
            }
        }
        state.lock = self.locks.get(workspace).cloned();
        state.layout = self.layout_flags.get(workspace).cloned();
        Ok(state)
    }

    fn get_container(&self, id: &ContainerId) -> Result<Option<Container>, StoreError> {
        Ok(self.containers.get(id).cloned())
    }

    fn insert_container(&mut self, container: Container) -> Result<(), StoreError> {
        if self.containers.contains_key(&container.id) {
            return Err(StoreError::AlreadyExists {
                collection: TargetCollection::Containers,
                id: container.id.to_string(),
            });
        }
        self.containers.insert(container.id.clone(), container);
        Ok(())
    }

    fn put_container(&mut self, container: Container) -> Result<(), StoreError> {
        if !self.containers.contains_key(&container.id) {
            return Err(StoreError::NotFound {
                collection: TargetCollection::Containers,
                id: container.id.to_string(),
            });
        }
        self.containers.insert(container.id.clone(), container);
        Ok(())
    }

    fn delete_container(&mut self, id: &ContainerId) -> Result<(), StoreError> {
        self.containers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                collection: TargetCollection::Containers,
                id: id.to_string(),
            })
    }

    fn insert_port(&mut self, port: Port) -> Result<(), StoreError> {
        if self.ports.contains_key(&port.id) {
            return Err(StoreError::AlreadyExists {
                collection: TargetCollection::Ports,
                id: port.id.to_string(),
            });
        }
        self.ports.insert(port.id.clone(), port);
        Ok(())
    }

    fn delete_port(&mut self, id: &PortId) -> Result<(), StoreError> {
        self.ports
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                collection: TargetCollection::Ports,
                id: id.to_string(),
            })
    }

    fn insert_edge(&mut self, edge: RelationshipEdge) -> Result<(), StoreError> {
        if self.edges.contains_key(&edge.id) {
            return Err(StoreError::AlreadyExists {
                collection: TargetCollection::Edges,
                id: edge.id.to_string(),
            });
        }
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    fn delete_edge(&mut self, id: &EdgeId) -> Result<(), StoreError> {
        self.edges
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                collection: TargetCollection::Edges,
                id: id.to_string(),
            })
    }

    fn insert_reference(&mut self, reference: Reference) -> Result<(), StoreError> {
        if self.references.contains_key(&reference.id) {
            return Err(StoreError::AlreadyExists {
                collection: TargetCollection::References,
                id: reference.id.to_string(),
            });
        }
        self.references.insert(reference.id.clone(), reference);
        Ok(())
    }

    fn delete_reference(&mut self, id: &ReferenceId) -> Result<(), StoreError> {
        self.references
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                collection: TargetCollection::References,
                id: id.to_string(),
            })
    }

    fn put_visibility(&mut self, setting: VisibilitySetting) -> Result<(), StoreError> {
        let key = (
            setting.workspace.clone(),
            setting.user.as_str().to_string(),
            setting.container.clone(),
        );
        self.visibility.insert(key, setting);
        Ok(())
    }

    fn get_lock(&self, workspace: &WorkspaceId) -> Result<Option<CanvasLock>, StoreError> {
        Ok(self.locks.get(workspace).cloned())
    }

    fn put_lock(&mut self, lock: CanvasLock) -> Result<(), StoreError> {
        self.locks.insert(lock.workspace.clone(), lock);
        Ok(())
    }

    fn delete_lock(&mut self, workspace: &WorkspaceId) -> Result<(), StoreError> {
        self.locks.remove(workspace);
        Ok(())
    }

    fn get_layout_flag(&self, workspace: &WorkspaceId) -> Result<Option<LayoutFlag>, StoreError> {
        Ok(self.layout_flags.get(workspace).cloned())
    }

    fn put_layout_flag(&mut self, flag: LayoutFlag) -> Result<(), StoreError> {
        self.layout_flags.insert(flag.workspace.clone(), flag);
        Ok(())
    }

    fn create_authoritative_entity(
        &mut self,
        entity: &EntityKey,
        title: &str,
    ) -> Result<(), StoreError> {
        if self.authoritative.contains_key(entity) {
            return Err(StoreError::AlreadyExists {
                collection: entity.entity_type.collection(),
                id: entity.to_string(),
            });
        }
        self.authoritative.insert(
            entity.clone(),
            AuthoritativeRow {
                title: title.to_string(),
                parent: None,
            },
        );
        Ok(())
    }

    fn link_authoritative_child(
        &mut self,
        parent: &EntityKey,
        child: &EntityKey,
    ) -> Result<(), StoreError> {
        let Some(row) = self.authoritative.get_mut(child) else {
            return Err(StoreError::NotFound {
                collection: child.entity_type.collection(),
                id: child.to_string(),
            });
        };
        row.parent = Some(parent.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActorId, Position, Size, Stamp, WallClock};

    fn ws() -> WorkspaceId {
        WorkspaceId::new("w1").unwrap()
    }

    fn container(workspace: &WorkspaceId) -> Container {
        Container::new(
            ContainerId::generate(),
            workspace.clone(),
            Some("x".into()),
            None,
            Position::new(0.0, 0.0),
            Size::new(10.0, 10.0),
            None,
            false,
            None,
            Stamp::new(WallClock(1), ActorId::new("a").unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn snapshot_requires_known_workspace() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.snapshot(&ws()),
            Err(StoreError::UnknownWorkspace(_))
        ));
    }

    #[test]
    fn insert_is_create_only() {
        let mut store = MemoryStore::new();
        store.create_workspace(ws());
        let c = container(&ws());
        store.insert_container(c.clone()).unwrap();
        assert!(matches!(
            store.insert_container(c),
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn snapshot_filters_by_workspace() {
        let mut store = MemoryStore::new();
        let (w1, w2) = (ws(), WorkspaceId::new("w2").unwrap());
        store.create_workspace(w1.clone());
        store.create_workspace(w2.clone());
        store.insert_container(container(&w1)).unwrap();
        store.insert_container(container(&w2)).unwrap();

        assert_eq!(store.snapshot(&w1).unwrap().containers.len(), 1);
        assert_eq!(store.snapshot(&w2).unwrap().containers.len(), 1);
    }
}
