//! Sync guards: gate every cross-domain operation.
//!
//! A denial is an expected steady state ("nothing to sync"), never an
//! error. Guards return a decision with a diagnostic reason; they never
//! throw and never silently drop.

use super::container::Container;
use super::identity::ContainerId;
use super::recon::ReconciliationMap;
use super::reference::EntityKey;
use super::state::CanvasState;

/// Outcome of a guard check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardDecision {
    pub allowed: bool,
    /// Resolved authoritative linkage for the caller to act on.
    pub entity: Option<EntityKey>,
    pub reason: Option<String>,
}

impl GuardDecision {
    fn allow(entity: EntityKey) -> Self {
        Self {
            allowed: true,
            entity: Some(entity),
            reason: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            entity: None,
            reason: Some(reason.into()),
        }
    }
}

/// Integrated = the object carries an authoritative backing.
pub fn is_integrated(container: &Container) -> bool {
    container.is_integrated()
}

/// Gate a visualization→authoritative operation.
pub fn guard_outbound(state: &CanvasState, container: &ContainerId, operation: &str) -> GuardDecision {
    classify_outbound(state.containers.get(container), container, operation)
}

/// Row-level variant for callers holding a freshly fetched row rather
/// than a snapshot (the execution engine mid-plan).
pub fn classify_outbound(
    found: Option<&Container>,
    container: &ContainerId,
    operation: &str,
) -> GuardDecision {
    let Some(found) = found else {
        return GuardDecision::deny(format!(
            "{operation}: container {container} not found; nothing to sync"
        ));
    };
    match &found.origin {
        Some(entity) => GuardDecision::allow(entity.clone()),
        None => GuardDecision::deny(format!(
            "{operation}: container {container} is local-only; nothing to sync"
        )),
    }
}

/// Gate an authoritative→visualization operation.
///
/// An entity with no mirror is a deliberate no-op: new entities are
/// mirrored only through the materializer, never ad-hoc inbound sync.
pub fn guard_inbound(recon: &ReconciliationMap, entity: &EntityKey, operation: &str) -> GuardDecision {
    let check = recon.check_entity(entity);
    if check.exists {
        GuardDecision::allow(entity.clone())
    } else {
        GuardDecision::deny(format!("{operation}: no mirror for {entity}; nothing to sync"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::container::{Position, Size};
    use crate::core::domain::EntityType;
    use crate::core::identity::{ActorId, EntityId, WorkspaceId};
    use crate::core::time::{Stamp, WallClock};

    fn state_with(origin: Option<EntityKey>) -> (CanvasState, ContainerId) {
        let ws = WorkspaceId::new("w1").unwrap();
        let container = Container::new(
            crate::core::identity::ContainerId::generate(),
            ws,
            Some("x".into()),
            None,
            Position::new(0.0, 0.0),
            Size::new(10.0, 10.0),
            None,
            origin.is_some(),
            origin,
            Stamp::new(WallClock(1), ActorId::new("a").unwrap()),
        )
        .unwrap();
        let id = container.id.clone();
        let mut state = CanvasState::default();
        state.containers.upsert(container);
        (state, id)
    }

    #[test]
    fn outbound_denies_local_only() {
        let (state, id) = state_with(None);
        let decision = guard_outbound(&state, &id, "update_entity");
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("local-only"));
    }

    #[test]
    fn outbound_allows_integrated_with_linkage() {
        let entity = EntityKey::new(EntityType::Task, EntityId::new("t1").unwrap());
        let (state, id) = state_with(Some(entity.clone()));
        let decision = guard_outbound(&state, &id, "update_entity");
        assert!(decision.allowed);
        assert_eq!(decision.entity, Some(entity));
    }

    #[test]
    fn inbound_denies_unmirrored_entity() {
        let ws = WorkspaceId::new("w1").unwrap();
        let recon = ReconciliationMap::build(ws, [], WallClock(1));
        let entity = EntityKey::new(EntityType::Track, EntityId::new("t1").unwrap());
        let decision = guard_inbound(&recon, &entity, "entity_updated");
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("no mirror"));
    }
}
