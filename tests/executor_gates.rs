//! Execution engine gates: lock, authority boundary, repairs,
//! post-commit effects.

mod fixtures;

use fixtures::canvas::{FailingSink, Harness, SharedSink, alice, bob, task, ws};
use mural::engine::Executor;
use mural::{
    CanvasLock, CanvasStore, Clock, ContainerId, ContainerPatch, DomainEvent, EntityKey, Error,
    ExecError, ExecutionHistory, FailureKind, Mutation, Patch, Plan, PlannedMutation, Position,
    Repair, UserIntent, WallClock, Warning,
};

fn move_intent(container: &ContainerId) -> UserIntent {
    UserIntent::Move {
        container: container.clone(),
        position: Position::new(500.0, 500.0),
    }
}

#[test]
fn write_without_lock_fails_and_leaves_state_untouched() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    let id = h.create_object(&alice(), "card");
    h.release_as(&alice());

    let before = h.state().containers.get(&id).unwrap().position;
    let err = h.orch.handle_intent(&ws(), &alice(), move_intent(&id)).unwrap_err();
    let Error::Exec(exec) = err else {
        panic!("expected execution error");
    };
    assert_eq!(exec.kind(), FailureKind::LockViolation);
    assert_eq!(h.state().containers.get(&id).unwrap().position, before);
}

#[test]
fn expired_lock_fails_lock_violation() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    let id = h.create_object(&alice(), "card");

    // Replace the lock with one that expired long ago.
    h.orch
        .store_mut()
        .put_lock(CanvasLock::new(ws(), alice(), WallClock(5)))
        .unwrap();

    let err = h.orch.handle_intent(&ws(), &alice(), move_intent(&id)).unwrap_err();
    let Error::Exec(exec) = err else {
        panic!("expected execution error");
    };
    assert_eq!(exec.kind(), FailureKind::LockViolation);
}

#[test]
fn foreign_lock_holder_fails_lock_violation() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    let id = h.create_object(&alice(), "card");
    h.release_as(&alice());
    h.lock_as(&bob());

    let err = h.orch.handle_intent(&ws(), &alice(), move_intent(&id)).unwrap_err();
    let Error::Exec(exec) = err else {
        panic!("expected execution error");
    };
    assert_eq!(exec.kind(), FailureKind::LockViolation);
}

#[test]
fn acquiring_a_contended_lock_fails_explicitly() {
    let mut h = Harness::new();
    h.lock_as(&bob());

    let err = h
        .orch
        .handle_intent(&ws(), &alice(), UserIntent::AcquireLock { ttl_ms: None })
        .unwrap_err();
    let Error::Exec(exec) = err else {
        panic!("expected execution error");
    };
    assert_eq!(exec.kind(), FailureKind::LockViolation);
}

#[test]
fn renewal_is_idempotent_for_the_holder_only() {
    let mut h = Harness::new();
    h.lock_as(&alice());

    h.orch
        .handle_intent(&ws(), &alice(), UserIntent::RenewLock { ttl_ms: Some(60_000) })
        .unwrap();
    let renewed = h.state().lock.unwrap();
    assert_eq!(renewed.holder, alice());
    assert!(renewed.expires > WallClock(1_000));

    let err = h
        .orch
        .handle_intent(&ws(), &bob(), UserIntent::RenewLock { ttl_ms: None })
        .unwrap_err();
    let Error::Exec(exec) = err else {
        panic!("expected execution error");
    };
    assert_eq!(exec.kind(), FailureKind::LockViolation);
}

#[test]
fn unpaired_authoritative_mutation_is_forbidden_and_atomic() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    let entity = task("t-rogue");

    // Hand-built plan: a container create plus an authoritative write
    // with no paired reference attach. Must fail validation with zero
    // observable mutations.
    let mut plan = Plan::new(ws());
    let probe = h.create_object(&alice(), "probe");
    let container = h.state().containers.get(&probe).unwrap().clone();
    let mut rogue = container.clone();
    rogue.id = ContainerId::generate();
    rogue.origin = Some(entity.clone());
    plan.push(PlannedMutation::repaired(Mutation::CreateContainer {
        container: rogue.clone(),
    }));
    plan.push(PlannedMutation::bare(Mutation::CreateAuthoritativeEntity {
        entity: entity.clone(),
        title: "rogue".into(),
        container: rogue.id.clone(),
    }));

    let mut history = ExecutionHistory::new();
    let mut clock = Clock::fixed(2_000);
    let containers_before = h.state().containers.len();

    let store = h.orch.store_mut();
    let mut executor = Executor::new(store, &mut history, None, &mut clock, 256);
    let err = executor.execute(plan, &alice()).unwrap_err();

    assert_eq!(err.kind(), FailureKind::ForbiddenOperation);
    assert!(matches!(err, ExecError::ForbiddenOperation { index: 1, .. }));
    // all-or-nothing: the container create never applied either
    assert_eq!(h.state().containers.len(), containers_before);
    assert_eq!(h.orch.store().authoritative_entities().count(), 0);
}

#[test]
fn repair_outside_the_whitelist_is_forbidden() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    let id = h.create_object(&alice(), "card");

    let mut plan = Plan::new(ws());
    plan.push(PlannedMutation {
        op: Mutation::DeleteContainer { id },
        repair: Some(Repair::StampTimestamps),
    });

    let mut history = ExecutionHistory::new();
    let mut clock = Clock::fixed(2_000);
    let store = h.orch.store_mut();
    let mut executor = Executor::new(store, &mut history, None, &mut clock, 256);
    let err = executor.execute(plan, &alice()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::ForbiddenRepair);
}

#[test]
fn create_integrated_object_reaches_the_authoritative_store() {
    let mut h = Harness::new();
    h.lock_as(&alice());

    let out = h
        .orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::CreateIntegratedObject {
                entity_type: mural::EntityType::Task,
                title: "Ship it".into(),
                body: None,
                position: Position::new(100.0, 100.0),
                size: mural::Size::new(320.0, 200.0),
                parent_entity: None,
            },
        )
        .unwrap();
    assert!(out.plan_id.is_some());

    let rows: Vec<(&EntityKey, _)> = h.orch.store().authoritative_entities().collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1.title, "Ship it");
    let entity = rows[0].0.clone();

    let container = h.container_for(&entity).unwrap();
    assert!(!container.is_ghost, "user-created integrated objects start active");
    assert_eq!(container.origin, Some(entity));
}

#[test]
fn telemetry_failure_is_a_warning_not_a_failure() {
    let mut h = Harness::with_sink(Box::new(FailingSink));
    h.lock_as(&alice());

    let out = h
        .orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::CreateObject {
                title: Some("card".into()),
                body: None,
                position: Position::new(0.0, 0.0),
                size: mural::Size::new(100.0, 100.0),
                parent: None,
                metadata: Default::default(),
            },
        )
        .unwrap();

    assert!(out.plan_id.is_some());
    assert!(out
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::TelemetryDropped { .. })));
    assert_eq!(h.state().containers.len(), 1, "commit stands");
}

#[test]
fn events_are_forwarded_only_after_commit() {
    let sink = SharedSink::new();
    let mut h = Harness::with_sink(Box::new(sink.clone()));
    h.lock_as(&alice());
    let id = h.create_object(&alice(), "card");
    let created_events = sink.events().len();
    assert!(created_events > 0);

    // A failing plan must not forward anything new.
    h.release_as(&alice());
    let _ = h.orch.handle_intent(&ws(), &alice(), move_intent(&id)).unwrap_err();
    // lock events (acquire/release) plus creation, but nothing from the
    // failed move
    assert!(!sink
        .events()
        .iter()
        .any(|e| matches!(e, DomainEvent::ContainerUpdated { .. })));
}

#[test]
fn content_invariant_is_rejected_before_the_store() {
    let mut h = Harness::new();
    h.lock_as(&alice());

    // Create with no content at all.
    let err = h
        .orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::CreateObject {
                title: None,
                body: Some("  ".into()),
                position: Position::new(0.0, 0.0),
                size: mural::Size::new(100.0, 100.0),
                parent: None,
                metadata: Default::default(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Plan(_)));
    assert_eq!(h.state().containers.len(), 0);

    // Update that would clear the last content field.
    let id = h.create_object(&alice(), "card");
    let err = h
        .orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::UpdateObject {
                container: id.clone(),
                patch: ContainerPatch {
                    title: Patch::Clear,
                    ..Default::default()
                },
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Plan(_)));
    assert_eq!(
        h.state().containers.get(&id).unwrap().title.as_deref(),
        Some("card")
    );
}

#[test]
fn ghosts_are_not_user_editable() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    let ghost = h.materialize(&alice(), &task("k1"), "Mirrored task");

    let err = h
        .orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::UpdateObject {
                container: ghost.id.clone(),
                patch: ContainerPatch {
                    title: Patch::Set("renamed".into()),
                    ..Default::default()
                },
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Plan(mural::PlanError::GhostReadOnly(_))));

    // Activation lifts the restriction.
    h.orch
        .handle_intent(&ws(), &alice(), UserIntent::ActivateGhost {
            container: ghost.id.clone(),
        })
        .unwrap();
    h.orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::UpdateObject {
                container: ghost.id.clone(),
                patch: ContainerPatch {
                    title: Patch::Set("renamed".into()),
                    ..Default::default()
                },
            },
        )
        .unwrap();
    assert_eq!(
        h.state().containers.get(&ghost.id).unwrap().title.as_deref(),
        Some("renamed")
    );
}
