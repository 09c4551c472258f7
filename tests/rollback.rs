//! Rollback: bounded history, best-effort inverses, honest accounting.

mod fixtures;

use fixtures::canvas::{Harness, SharedSink, alice, ws};
use mural::engine::Executor;
use mural::{
    Clock, ContainerPatch, Error, ExecutionHistory, FailureKind, Mutation, Patch, Plan,
    PlannedMutation, Warning,
};

#[test]
fn creations_reverse_updates_do_not() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    let b = h.create_object(&alice(), "card-b");

    // One plan: create container A, update B's title.
    let mut plan = Plan::new(ws());
    let mut a = h.state().containers.get(&b).unwrap().clone();
    a.id = mural::ContainerId::generate();
    a.title = Some("card-a".into());
    let a_id = a.id.clone();
    plan.push(PlannedMutation::repaired(Mutation::CreateContainer {
        container: a,
    }));
    plan.push(PlannedMutation::repaired(Mutation::UpdateContainer {
        id: b.clone(),
        patch: ContainerPatch {
            title: Patch::Set("card-b v2".into()),
            ..Default::default()
        },
    }));

    let mut history = ExecutionHistory::new();
    let mut clock = Clock::fixed(5_000);
    {
        let store = h.orch.store_mut();
        let mut executor = Executor::new(store, &mut history, None, &mut clock, 256);
        let outcome = executor.execute(plan, &alice()).unwrap();
        assert!(!outcome.reversible);
    }

    let store = h.orch.store_mut();
    let outcome =
        mural::engine::rollback_last(store, &mut history, &clock, &ws(), &alice()).unwrap();

    assert_eq!(outcome.undone, 1, "only the creation reverses");
    let reversal_warnings: Vec<_> = outcome
        .warnings
        .iter()
        .filter(|w| matches!(w, Warning::NotReversible { .. }))
        .collect();
    assert_eq!(reversal_warnings.len(), 1);

    let state = h.state();
    assert!(state.containers.get(&a_id).is_none(), "A was deleted");
    assert_eq!(
        state.containers.get(&b).unwrap().title.as_deref(),
        Some("card-b v2"),
        "B keeps the value the update wrote; there is no prior-value capture"
    );
}

#[test]
fn history_keeps_the_last_three_plans() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    for n in 0..5 {
        h.create_object(&alice(), &format!("card-{n}"));
    }
    assert_eq!(h.orch.history().len(&ws()), 3);
}

#[test]
fn lock_only_plans_are_not_recorded() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    h.release_as(&alice());
    assert_eq!(h.orch.history().len(&ws()), 0);
}

#[test]
fn rollback_requires_the_lock() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    h.create_object(&alice(), "card");
    h.release_as(&alice());

    let err = h.orch.rollback_last(&ws(), &alice()).unwrap_err();
    let Error::Exec(exec) = err else {
        panic!("expected execution error");
    };
    assert_eq!(exec.kind(), FailureKind::LockViolation);
}

#[test]
fn empty_history_is_a_warned_noop() {
    let mut h = Harness::new();
    h.lock_as(&alice());

    let out = h.orch.rollback_last(&ws(), &alice()).unwrap();
    assert!(out.plan_id.is_none());
    assert!(matches!(out.warnings.as_slice(), [Warning::NothingToRollBack]));
}

#[test]
fn rollback_emits_no_events_or_telemetry() {
    let sink = SharedSink::new();
    let mut h = Harness::with_sink(Box::new(sink.clone()));
    h.lock_as(&alice());
    h.create_object(&alice(), "card");
    let seen = sink.events().len();

    let out = h.orch.rollback_last(&ws(), &alice()).unwrap();
    assert!(out.plan_id.is_some());
    assert!(out.events.is_empty());
    assert_eq!(sink.events().len(), seen, "rollback is silent");
    assert_eq!(h.state().containers.len(), 0);
}

#[test]
fn rollback_of_a_creation_deletes_ports_too() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    h.create_object(&alice(), "card");
    assert_eq!(h.state().ports.len(), 2);

    let out = h.orch.rollback_last(&ws(), &alice()).unwrap();
    // container + two ports reversed
    assert_eq!(out.applied, 3);
    assert_eq!(h.state().containers.len(), 0);
    assert_eq!(h.state().ports.len(), 0);
}
