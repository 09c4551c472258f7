#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use mural::{
    ActorId, AuthoritativeEvent, CanvasState, Container, ContainerId, DomainEvent, EntityId,
    EntityKey, EntityType, MemoryStore, Orchestrator, TelemetryError, TelemetrySink, UserIntent,
    WorkspaceId,
};
use mural::{CanvasStore, Clock};

pub fn ws() -> WorkspaceId {
    WorkspaceId::new("ws-test").unwrap()
}

pub fn alice() -> ActorId {
    ActorId::new("alice").unwrap()
}

pub fn bob() -> ActorId {
    ActorId::new("bob").unwrap()
}

pub fn track(id: &str) -> EntityKey {
    EntityKey::new(EntityType::Track, EntityId::new(id).unwrap())
}

pub fn task(id: &str) -> EntityKey {
    EntityKey::new(EntityType::Task, EntityId::new(id).unwrap())
}

/// Telemetry sink that remembers everything it saw.
#[derive(Clone, Default)]
pub struct SharedSink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl SharedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TelemetrySink for SharedSink {
    fn record(&self, event: &DomainEvent) -> Result<(), TelemetryError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Telemetry sink that always refuses.
pub struct FailingSink;

impl TelemetrySink for FailingSink {
    fn record(&self, _event: &DomainEvent) -> Result<(), TelemetryError> {
        Err(TelemetryError::new("collector offline"))
    }
}

/// One workspace, an in-memory store, a deterministic clock.
pub struct Harness {
    pub orch: Orchestrator<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_orchestrator(|o| o)
    }

    pub fn with_sink(sink: Box<dyn TelemetrySink>) -> Self {
        Self::with_orchestrator(|o| o.with_telemetry(sink))
    }

    fn with_orchestrator(
        f: impl FnOnce(Orchestrator<MemoryStore>) -> Orchestrator<MemoryStore>,
    ) -> Self {
        let mut store = MemoryStore::new();
        store.create_workspace(ws());
        let orch = Orchestrator::new(store).with_clock(Clock::fixed(1_000));
        Self { orch: f(orch) }
    }

    pub fn state(&self) -> CanvasState {
        self.orch.store().snapshot(&ws()).unwrap()
    }

    /// Acquire the canvas lock as `actor` and assert it worked.
    pub fn lock_as(&mut self, actor: &ActorId) {
        let out = self
            .orch
            .handle_intent(&ws(), actor, UserIntent::AcquireLock { ttl_ms: None })
            .expect("acquire lock");
        assert!(out.plan_id.is_some());
    }

    pub fn release_as(&mut self, actor: &ActorId) {
        self.orch
            .handle_intent(&ws(), actor, UserIntent::ReleaseLock)
            .expect("release lock");
    }

    /// Mirror an authoritative entity and return its container.
    pub fn materialize(&mut self, actor: &ActorId, entity: &EntityKey, title: &str) -> Container {
        let out = self
            .orch
            .handle_event(
                &ws(),
                actor,
                AuthoritativeEvent::EntityCreated {
                    entity_type: entity.entity_type,
                    entity_id: entity.entity_id.clone(),
                    title: title.to_string(),
                    body: None,
                    parent: None,
                },
            )
            .expect("materialize entity");
        assert!(out.plan_id.is_some(), "expected a materialization plan");
        self.container_for(entity).expect("mirror container exists")
    }

    /// The container mirroring `entity`, if any, resolved through the
    /// persisted reference table.
    pub fn container_for(&self, entity: &EntityKey) -> Option<Container> {
        let state = self.state();
        let reference = state
            .references
            .iter()
            .map(|(_, r)| r)
            .find(|r| r.links_entity(entity))?;
        state.containers.get(&reference.container).cloned()
    }

    /// Create a local-only object as `actor` (who must hold the lock).
    pub fn create_object(&mut self, actor: &ActorId, title: &str) -> ContainerId {
        let out = self
            .orch
            .handle_intent(
                &ws(),
                actor,
                UserIntent::CreateObject {
                    title: Some(title.to_string()),
                    body: None,
                    position: mural::Position::new(10.0, 10.0),
                    size: mural::Size::new(200.0, 120.0),
                    parent: None,
                    metadata: Default::default(),
                },
            )
            .expect("create object");
        assert!(out.plan_id.is_some());
        let state = self.state();
        state
            .containers
            .iter()
            .find(|(_, c)| c.title.as_deref() == Some(title))
            .map(|(id, _)| id.clone())
            .expect("created container present")
    }
}
