//! CanvasState: the read snapshot plan generators work against.
//!
//! Typed store wrappers keep keys unique by construction; the snapshot
//! is assembled by the persistence layer and never written directly.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::container::Container;
use super::edge::RelationshipEdge;
use super::identity::{ContainerId, EdgeId, PortId, ReferenceId, WorkspaceId};
use super::layout_flag::LayoutFlag;
use super::lock::CanvasLock;
use super::port::Port;
use super::reference::Reference;
use super::visibility::VisibilitySetting;

/// Canonical container store for one workspace.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerStore {
    by_id: BTreeMap<ContainerId, Container>,
}

impl ContainerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, container: Container) {
        self.by_id.insert(container.id.clone(), container);
    }

    pub fn get(&self, id: &ContainerId) -> Option<&Container> {
        self.by_id.get(id)
    }

    pub fn remove(&mut self, id: &ContainerId) -> Option<Container> {
        self.by_id.remove(id)
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContainerId, &Container)> {
        self.by_id.iter()
    }

    pub fn children_of(&self, parent: &ContainerId) -> Vec<&Container> {
        self.by_id
            .values()
            .filter(|c| c.parent.as_ref() == Some(parent))
            .collect()
    }
}

/// Port store with an owner index baked into iteration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortStore {
    by_id: BTreeMap<PortId, Port>,
}

impl PortStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, port: Port) {
        self.by_id.insert(port.id.clone(), port);
    }

    pub fn get(&self, id: &PortId) -> Option<&Port> {
        self.by_id.get(id)
    }

    pub fn remove(&mut self, id: &PortId) -> Option<Port> {
        self.by_id.remove(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PortId, &Port)> {
        self.by_id.iter()
    }

    pub fn owned_by(&self, owner: &ContainerId) -> Vec<&Port> {
        self.by_id.values().filter(|p| &p.owner == owner).collect()
    }
}

/// Edge store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeStore {
    by_id: BTreeMap<EdgeId, RelationshipEdge>,
}

impl EdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, edge: RelationshipEdge) {
        self.by_id.insert(edge.id.clone(), edge);
    }

    pub fn get(&self, id: &EdgeId) -> Option<&RelationshipEdge> {
        self.by_id.get(id)
    }

    pub fn remove(&mut self, id: &EdgeId) -> Option<RelationshipEdge> {
        self.by_id.remove(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EdgeId, &RelationshipEdge)> {
        self.by_id.iter()
    }

    pub fn touching_any(&self, ports: &BTreeSet<PortId>) -> Vec<&RelationshipEdge> {
        self.by_id
            .values()
            .filter(|e| ports.contains(&e.source) || ports.contains(&e.target))
            .collect()
    }

    pub fn between(&self, a: &PortId, b: &PortId) -> Option<&RelationshipEdge> {
        self.by_id.values().find(|e| {
            (&e.source == a && &e.target == b) || (&e.source == b && &e.target == a)
        })
    }
}

/// Reference store, indexed by id with a container lookup.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceStore {
    by_id: BTreeMap<ReferenceId, Reference>,
}

impl ReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, reference: Reference) {
        self.by_id.insert(reference.id.clone(), reference);
    }

    pub fn get(&self, id: &ReferenceId) -> Option<&Reference> {
        self.by_id.get(id)
    }

    pub fn remove(&mut self, id: &ReferenceId) -> Option<Reference> {
        self.by_id.remove(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ReferenceId, &Reference)> {
        self.by_id.iter()
    }

    pub fn for_container(&self, container: &ContainerId) -> Option<&Reference> {
        self.by_id.values().find(|r| &r.container == container)
    }
}

/// One workspace's canvas, as of a snapshot instant.
#[derive(Clone, Debug, Default)]
pub struct CanvasState {
    pub containers: ContainerStore,
    pub ports: PortStore,
    pub edges: EdgeStore,
    pub references: ReferenceStore,
    pub lock: Option<CanvasLock>,
    pub visibility: Vec<VisibilitySetting>,
    pub layout: Option<LayoutFlag>,
}

impl CanvasState {
    pub fn layout_for(&self, workspace: &WorkspaceId) -> LayoutFlag {
        self.layout
            .clone()
            .unwrap_or_else(|| LayoutFlag::pristine(workspace.clone()))
    }

    /// Port ids owned by one container.
    pub fn port_ids_of(&self, container: &ContainerId) -> BTreeSet<PortId> {
        self.ports
            .owned_by(container)
            .into_iter()
            .map(|p| p.id.clone())
            .collect()
    }

    /// Edges whose endpoints touch any port of one container.
    pub fn edges_touching_container(&self, container: &ContainerId) -> Vec<&RelationshipEdge> {
        let ports = self.port_ids_of(container);
        self.edges.touching_any(&ports)
    }

    /// Would re-parenting `child` under `parent` create a cycle?
    pub fn would_create_nest_cycle(&self, child: &ContainerId, parent: &ContainerId) -> bool {
        if child == parent {
            return true;
        }
        let mut current = Some(parent.clone());
        let mut hops = 0usize;
        while let Some(id) = current {
            if &id == child {
                return true;
            }
            // depth guard against already-corrupt parent chains
            hops += 1;
            if hops > self.containers.len() {
                return true;
            }
            current = self
                .containers
                .get(&id)
                .and_then(|c| c.parent.clone());
        }
        false
    }
}
