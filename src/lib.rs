#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod store;
pub mod telemetry;

pub use error::{Effect, Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export core types at crate root for convenience
pub use crate::core::{
    ActorId, AuthoritativeEvent, CanvasLock, CanvasState, Container, ContainerId, ContainerPatch,
    DomainEvent, EdgeDirection, EdgeId, EntityChanges, EntityId, EntityKey, EntityLink, EntityType,
    FieldName, LayoutFlag, Limits, Mutation, Patch, Plan, PlanId, PlannedMutation, Port, PortId,
    PortKind, Position, Reference, ReferenceId, RelationKind, RelationshipEdge, Repair, Size,
    Stamp, TargetCollection, UserIntent, VisibilitySetting, WallClock, WorkspaceId,
};
pub use crate::engine::{
    Clock, ExecError, ExecOutcome, ExecutionHistory, FailureKind, Orchestrated, Orchestrator,
    PlanContext, PlanError, Planned, RollbackOutcome, StoredExecutionRecord, Warning,
};
pub use crate::store::{CanvasStore, MemoryStore, StoreError};
pub use crate::telemetry::{TelemetryError, TelemetrySink};
