//! End-to-end orchestration: the mirror lifecycle, layout gating,
//! edges, and the closed intent surface.

mod fixtures;

use std::collections::BTreeMap;

use fixtures::canvas::{Harness, alice, bob, track, ws};
use mural::{
    AuthoritativeEvent, EdgeDirection, Error, PlanError, PortKind, Position, RelationKind,
    UserIntent, Warning,
};

/// Workspace W has no references. Materialize track t1 → container +
/// reference. Materialize again → no-op. Delete via authoritative
/// event → cascade. Roll back the deletion → reported non-reversible,
/// nothing restored.
#[test]
fn mirror_lifecycle_end_to_end() {
    let mut h = Harness::new();
    h.lock_as(&alice());

    let o1 = h.materialize(&alice(), &track("t1"), "Roadmap");
    assert_eq!(h.state().references.len(), 1);

    // idempotent re-materialization
    let out = h
        .orch
        .handle_event(
            &ws(),
            &alice(),
            AuthoritativeEvent::EntityCreated {
                entity_type: track("t1").entity_type,
                entity_id: track("t1").entity_id,
                title: "Roadmap".into(),
                body: None,
                parent: None,
            },
        )
        .unwrap();
    assert!(out.plan_id.is_none());
    assert_eq!(h.state().references.len(), 1);

    // authoritative deletion cascades
    h.orch
        .handle_event(
            &ws(),
            &alice(),
            AuthoritativeEvent::EntityDeleted {
                entity_type: track("t1").entity_type,
                entity_id: track("t1").entity_id,
            },
        )
        .unwrap();
    assert!(h.state().containers.get(&o1.id).is_none());
    assert_eq!(h.state().references.len(), 0);

    // the deletion cannot be rolled back
    let rolled = h.orch.rollback_last(&ws(), &alice()).unwrap();
    assert!(rolled
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::NotReversible { .. })));
    assert!(h.state().containers.get(&o1.id).is_none(), "O1 stays gone");
}

#[test]
fn manual_move_permanently_breaks_auto_layout() {
    let mut h = Harness::new();
    h.lock_as(&alice());

    let first = h.materialize(&alice(), &track("t1"), "One");
    let slot0 = first.position;

    // grid placement advances while pristine
    let second = h.materialize(&alice(), &track("t2"), "Two");
    assert_ne!(second.position, slot0);

    // first manual reposition breaks the flag
    h.orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::Move {
                container: first.id.clone(),
                position: Position::new(900.0, 40.0),
            },
        )
        .unwrap();
    let flag = h.state().layout.expect("flag persisted");
    assert!(flag.broken);

    // materialization no longer auto-arranges: new mirrors land on the
    // default slot
    let third = h.materialize(&alice(), &track("t3"), "Three");
    assert_eq!(third.position, slot0);
}

#[test]
fn reset_layout_restores_the_grid_and_reenables_auto_layout() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    let first = h.materialize(&alice(), &track("t1"), "One");
    let home = first.position;

    h.orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::Move {
                container: first.id.clone(),
                position: Position::new(900.0, 40.0),
            },
        )
        .unwrap();
    assert!(h.state().layout.as_ref().map(|f| f.broken).unwrap_or(false));

    h.orch
        .handle_intent(&ws(), &alice(), UserIntent::ResetLayout)
        .unwrap();

    let state = h.state();
    let flag = state.layout.expect("flag persisted");
    assert!(!flag.broken);
    assert!(flag.last_reset.is_some());
    assert_eq!(state.containers.get(&first.id).unwrap().position, home);
}

#[test]
fn manual_edges_connect_ports_and_reject_content_metadata() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    let a = h.materialize(&alice(), &track("t1"), "One");
    let b = h.materialize(&alice(), &track("t2"), "Two");

    let state = h.state();
    let a_out = state
        .ports
        .owned_by(&a.id)
        .into_iter()
        .find(|p| p.kind == PortKind::Output)
        .unwrap()
        .id
        .clone();
    let b_in = state
        .ports
        .owned_by(&b.id)
        .into_iter()
        .find(|p| p.kind == PortKind::Input)
        .unwrap()
        .id
        .clone();

    // content-bearing metadata is rejected outright
    let mut contentful = BTreeMap::new();
    contentful.insert("note".to_string(), "remember the milk".to_string());
    let err = h
        .orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::CreateManualEdge {
                source: a_out.clone(),
                target: b_in.clone(),
                relation: RelationKind::DependsOn,
                direction: EdgeDirection::Forward,
                metadata: contentful,
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Plan(PlanError::Core(_))));

    // structural metadata is fine
    let mut structural = BTreeMap::new();
    structural.insert("weight".to_string(), "2".to_string());
    h.orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::CreateManualEdge {
                source: a_out.clone(),
                target: b_in.clone(),
                relation: RelationKind::DependsOn,
                direction: EdgeDirection::Forward,
                metadata: structural,
            },
        )
        .unwrap();
    let state = h.state();
    assert_eq!(state.edges.len(), 1);
    let (edge_id, edge) = state.edges.iter().next().unwrap();
    assert!(!edge.auto_generated);

    // duplicate edges between the same ports are refused
    let err = h
        .orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::CreateManualEdge {
                source: a_out,
                target: b_in,
                relation: RelationKind::Relates,
                direction: EdgeDirection::Bidirectional,
                metadata: BTreeMap::new(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Plan(PlanError::EdgeExists { .. })));

    // and deletion removes them
    let edge_id = edge_id.clone();
    h.orch
        .handle_intent(&ws(), &alice(), UserIntent::DeleteEdge { edge: edge_id })
        .unwrap();
    assert_eq!(h.state().edges.len(), 0);
}

#[test]
fn nesting_rejects_cycles() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    let a = h.create_object(&alice(), "a");
    let b = h.create_object(&alice(), "b");

    h.orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::Nest {
                child: b.clone(),
                parent: a.clone(),
            },
        )
        .unwrap();
    assert_eq!(
        h.state().containers.get(&b).unwrap().parent.as_ref(),
        Some(&a)
    );

    let err = h
        .orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::Nest {
                child: a.clone(),
                parent: b.clone(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Plan(PlanError::NestCycle { .. })));

    // unnest clears the parent again
    h.orch
        .handle_intent(&ws(), &alice(), UserIntent::Unnest { child: b.clone() })
        .unwrap();
    assert!(h.state().containers.get(&b).unwrap().parent.is_none());
}

#[test]
fn per_user_visibility_is_scoped_to_the_actor() {
    let mut h = Harness::new();
    h.lock_as(&alice());
    let id = h.create_object(&alice(), "card");

    h.orch
        .handle_intent(
            &ws(),
            &alice(),
            UserIntent::SetVisibility {
                container: id.clone(),
                hidden: Some(true),
                collapsed: None,
            },
        )
        .unwrap();

    let state = h.state();
    assert_eq!(state.visibility.len(), 1);
    let setting = &state.visibility[0];
    assert_eq!(setting.user, alice());
    assert!(setting.hidden);
    assert!(!setting.collapsed);

    // bob's view is untouched
    assert!(!state.visibility.iter().any(|v| v.user == bob()));
}

#[test]
fn unknown_intent_kinds_fail_at_the_serde_boundary() {
    let raw = r#"{ "kind": "do_whatever", "payload": "anything" }"#;
    let parsed: Result<UserIntent, _> = serde_json::from_str(raw);
    assert!(parsed.is_err(), "unknown intent kinds never reach planning");
}

#[test]
fn intents_round_trip_through_serde() {
    let intent = UserIntent::Move {
        container: mural::ContainerId::generate(),
        position: Position::new(12.0, 34.0),
    };
    let raw = serde_json::to_string(&intent).unwrap();
    assert!(raw.contains("\"kind\":\"move\""));
    let back: UserIntent = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, intent);
}
