//! Plan generation from authoritative-domain change events.
//!
//! Materialization is idempotent: an entity that already has a mirror
//! plans to nothing, with a warning. A missing mirror on update/delete
//! is the guards' deliberate no-op, not an error.

use crate::core::{
    Container, ContainerId, ContainerPatch, DomainEvent, EntityChanges, EntityKey, FieldName,
    Mutation, Patch, Plan, PlannedMutation, PortKind, Reference, RelationshipEdge, Stamp,
};
use crate::core::{EdgeId, Port, PortId};
use crate::core::{AuthoritativeEvent, EdgeDirection, RelationKind, guard};
use crate::engine::intent_planner::push_container_cascade;
use crate::engine::layout;
use crate::engine::planner::{PlanContext, PlanError, Planned, Warning};

pub fn plan_authoritative_event(
    event: AuthoritativeEvent,
    ctx: &PlanContext<'_>,
) -> Result<Planned, PlanError> {
    tracing::debug!(
        kind = event.kind_str(),
        workspace = %ctx.workspace,
        entity = %event.entity(),
        "planning authoritative event"
    );
    let kind = event.kind_str();
    let mut planned = match event {
        AuthoritativeEvent::EntityCreated {
            entity_type,
            entity_id,
            title,
            body,
            parent,
        } => plan_materialize(
            ctx,
            EntityKey::new(entity_type, entity_id),
            title,
            body,
            parent,
        )?,
        AuthoritativeEvent::SubEntityCreated {
            parent,
            entity_type,
            entity_id,
            title,
        } => plan_materialize(
            ctx,
            EntityKey::new(entity_type, entity_id),
            title,
            None,
            Some(parent),
        )?,
        AuthoritativeEvent::EntityUpdated {
            entity_type,
            entity_id,
            changes,
        } => plan_entity_updated(ctx, EntityKey::new(entity_type, entity_id), changes)?,
        AuthoritativeEvent::EntityDeleted {
            entity_type,
            entity_id,
        } => plan_entity_deleted(ctx, EntityKey::new(entity_type, entity_id))?,
    };
    if let Some(plan) = planned.plan.as_mut() {
        plan.annotate("authoritative_event", kind);
    }
    Ok(planned)
}

/// Mirror a newly created authoritative entity as a ghost container.
fn plan_materialize(
    ctx: &PlanContext<'_>,
    entity: EntityKey,
    title: String,
    body: Option<String>,
    parent: Option<EntityKey>,
) -> Result<Planned, PlanError> {
    // System-wide safety gate: any duplicate anywhere in the workspace
    // blocks materialization until resolved out-of-band.
    ctx.recon.ensure_no_duplicates()?;

    let check = ctx.recon.check_entity(&entity);
    if check.exists {
        let mut warnings = vec![Warning::NoEffect {
            reason: format!("entity {entity} already exists on the canvas"),
        }];
        if let Some(container) = check.container {
            warnings = vec![Warning::AlreadyMirrored { entity, container }];
        }
        return Ok(Planned::noop(warnings));
    }

    let flag = ctx.state.layout_for(ctx.workspace);
    let (position, size) = layout::placement_for_new(ctx.state, &flag);
    let container = Container::new(
        ContainerId::generate(),
        ctx.workspace.clone(),
        Some(title),
        body,
        position,
        size,
        None,
        true,
        Some(entity.clone()),
        Stamp::new(ctx.now, ctx.actor.clone()),
    )?;
    let id = container.id.clone();
    let reference = Reference::single(ctx.workspace.clone(), id.clone(), entity.clone())?;

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::repaired(Mutation::CreateContainer {
        container,
    }));

    let input = Port {
        id: PortId::generate(),
        workspace: ctx.workspace.clone(),
        owner: id.clone(),
        name: "in".into(),
        kind: PortKind::Input,
    };
    let child_input = input.id.clone();
    let output = Port {
        id: PortId::generate(),
        workspace: ctx.workspace.clone(),
        owner: id.clone(),
        name: "out".into(),
        kind: PortKind::Output,
    };
    plan.push(PlannedMutation::bare(Mutation::CreatePort { port: input }));
    plan.push(PlannedMutation::bare(Mutation::CreatePort { port: output }));
    plan.push(PlannedMutation::bare(Mutation::AttachReference { reference }));

    plan.push_event(DomainEvent::ContainerCreated {
        workspace: ctx.workspace.clone(),
        container: id.clone(),
        integrated: true,
        entity: Some(entity.clone()),
    });
    plan.push_event(DomainEvent::ReferenceAttached {
        workspace: ctx.workspace.clone(),
        container: id,
        entity,
    });

    let mut warnings = Vec::new();
    if let Some(parent) = parent {
        push_hierarchy_edge(&mut plan, &mut warnings, ctx, &parent, child_input);
    }

    Ok(Planned {
        plan: Some(plan),
        warnings,
    })
}

/// Safely regenerable hierarchy edge from the mirrored parent's output
/// port to the new child's input port.
fn push_hierarchy_edge(
    plan: &mut Plan,
    warnings: &mut Vec<Warning>,
    ctx: &PlanContext<'_>,
    parent: &EntityKey,
    child_input: PortId,
) {
    let check = ctx.recon.check_entity(parent);
    let Some(parent_container) = check.container else {
        warnings.push(Warning::NoMirror {
            entity: parent.clone(),
            operation: "hierarchy_edge".into(),
        });
        return;
    };
    let Some(parent_out) = ctx
        .state
        .ports
        .owned_by(&parent_container)
        .into_iter()
        .find(|p| p.kind == PortKind::Output)
    else {
        warnings.push(Warning::NoEffect {
            reason: format!("parent container {parent_container} has no output port"),
        });
        return;
    };

    match RelationshipEdge::new(
        EdgeId::generate(),
        ctx.workspace.clone(),
        parent_out.id.clone(),
        child_input,
        RelationKind::Hierarchy,
        EdgeDirection::Forward,
        true,
        Default::default(),
    ) {
        Ok(edge) => {
            let edge_id = edge.id.clone();
            plan.push(PlannedMutation::bare(Mutation::CreateEdge { edge }));
            plan.push_event(DomainEvent::EdgeCreated {
                workspace: ctx.workspace.clone(),
                edge: edge_id,
                relation: RelationKind::Hierarchy,
                auto_generated: true,
            });
        }
        Err(err) => {
            warnings.push(Warning::NoEffect {
                reason: format!("hierarchy edge skipped: {err}"),
            });
        }
    }
}

fn plan_entity_updated(
    ctx: &PlanContext<'_>,
    entity: EntityKey,
    changes: EntityChanges,
) -> Result<Planned, PlanError> {
    let decision = guard::guard_inbound(ctx.recon, &entity, "entity_updated");
    if !decision.allowed {
        return Ok(Planned::noop(vec![Warning::NoMirror {
            entity,
            operation: "entity_updated".into(),
        }]));
    }

    let check = ctx.recon.check_entity(&entity);
    let Some(container_id) = check.container else {
        return Ok(Planned::noop(vec![Warning::NoMirror {
            entity,
            operation: "entity_updated".into(),
        }]));
    };
    let Some(_container) = ctx.state.containers.get(&container_id) else {
        return Err(PlanError::ContainerNotFound(container_id));
    };

    let mut warnings = Vec::new();
    let mut patch = ContainerPatch::default();
    let mut fields = Vec::new();
    if let Some(title) = changes.title {
        patch.title = Patch::Set(title);
        fields.push(FieldName::Title);
    }
    if let Some(body) = changes.body {
        patch.body = Patch::Set(body);
        fields.push(FieldName::Body);
    }
    if changes.parent.is_some() {
        // Re-parenting mirrors is not implemented; say so instead of
        // guessing hierarchy.
        warnings.push(Warning::FieldNotMapped {
            field: "parent".into(),
        });
    }
    for field in changes.other.keys() {
        warnings.push(Warning::FieldNotMapped {
            field: field.clone(),
        });
    }

    if patch.is_empty() {
        return Ok(Planned::noop(warnings));
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::repaired(Mutation::UpdateContainer {
        id: container_id.clone(),
        patch,
    }));
    plan.push_event(DomainEvent::ContainerUpdated {
        workspace: ctx.workspace.clone(),
        container: container_id,
        fields,
    });
    Ok(Planned {
        plan: Some(plan),
        warnings,
    })
}

fn plan_entity_deleted(ctx: &PlanContext<'_>, entity: EntityKey) -> Result<Planned, PlanError> {
    let check = ctx.recon.check_entity(&entity);
    let Some(container_id) = check.container else {
        return Ok(Planned::noop(vec![Warning::NoMirror {
            entity,
            operation: "entity_deleted".into(),
        }]));
    };
    if ctx.state.containers.get(&container_id).is_none() {
        return Ok(Planned::noop(vec![Warning::NoMirror {
            entity,
            operation: "entity_deleted".into(),
        }]));
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    push_container_cascade(&mut plan, ctx, &container_id);
    plan.push_event(DomainEvent::ContainerDeleted {
        workspace: ctx.workspace.clone(),
        container: container_id,
    });
    Ok(Planned::of(plan))
}
