//! Core domain types for the canvas mirror
//!
//! Module hierarchy follows type dependency order:
//! - time: WallClock, Stamp (Layer 0)
//! - identity: ActorId, WorkspaceId, generated ids (Layer 1)
//! - domain: EntityType, PortKind, RelationKind (Layer 2)
//! - container/port/edge/reference/lock: rows (Layers 3-7)
//! - collection/mutation/plan: the write vocabulary
//! - state: the read snapshot
//! - recon/guard: cross-domain safety

pub mod collection;
pub mod container;
pub mod domain;
pub mod edge;
pub mod error;
pub mod event;
pub mod guard;
pub mod identity;
pub mod intent;
pub mod layout_flag;
pub mod limits;
pub mod lock;
pub mod mutation;
pub mod patch;
pub mod plan;
pub mod port;
pub mod recon;
pub mod reference;
pub mod state;
pub mod time;
pub mod visibility;

pub use collection::{Authority, TargetCollection};
pub use container::{Container, ContainerPatch, FieldName, Position, Size};
pub use domain::{EdgeDirection, EntityType, PortKind, RelationKind};
pub use edge::{RelationshipEdge, reject_content_keys};
pub use error::{
    ContentInvariant, ContentKeyRejected, CoreError, InvalidEndpoints, InvalidId, InvalidValue,
    PrimaryLinkInvariant,
};
pub use event::{AuthoritativeEvent, DomainEvent, EntityChanges};
pub use guard::{GuardDecision, classify_outbound, guard_inbound, guard_outbound, is_integrated};
pub use identity::{
    ActorId, ContainerId, EdgeId, EntityId, PlanId, PortId, ReferenceId, WorkspaceId,
};
pub use intent::UserIntent;
pub use layout_flag::LayoutFlag;
pub use limits::Limits;
pub use lock::CanvasLock;
pub use mutation::{InverseMutation, Mutation, PlannedMutation, Repair};
pub use patch::Patch;
pub use plan::Plan;
pub use port::Port;
pub use recon::{DuplicateDiagnostic, DuplicateMapping, EntityCheck, ReconciliationMap};
pub use reference::{EntityKey, EntityLink, Reference};
pub use state::{CanvasState, ContainerStore, EdgeStore, PortStore, ReferenceStore};
pub use time::{Stamp, WallClock};
pub use visibility::VisibilitySetting;
