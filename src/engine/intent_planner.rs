//! Plan generation from user intents.
//!
//! Closed intent set, each kind mapping deterministically to 1..N
//! mutations. Reads the snapshot and the reconciliation map, writes
//! nothing.

use std::collections::BTreeMap;

use crate::core::{
    CanvasLock, Container, ContainerId, ContainerPatch, DomainEvent, EdgeDirection, EdgeId,
    EntityId, EntityKey, EntityType, FieldName, Mutation, Patch, Plan, PlannedMutation, Port,
    PortId, PortKind, Position, Reference, RelationKind, RelationshipEdge, Size, Stamp, UserIntent,
    VisibilitySetting,
};
use crate::engine::layout;
use crate::engine::planner::{
    PlanContext, PlanError, Planned, Warning, enforce_metadata_limits, enforce_text_limit,
    require_container,
};

pub fn plan_intent(intent: UserIntent, ctx: &PlanContext<'_>) -> Result<Planned, PlanError> {
    tracing::debug!(
        kind = intent.kind_str(),
        workspace = %ctx.workspace,
        "planning user intent"
    );
    let kind = intent.kind_str();
    let mut planned = match intent {
        UserIntent::Move {
            container,
            position,
        } => plan_move(ctx, &container, position)?,
        UserIntent::Resize { container, size } => plan_resize(ctx, &container, size)?,
        UserIntent::Nest { child, parent } => plan_nest(ctx, &child, &parent)?,
        UserIntent::Unnest { child } => plan_unnest(ctx, &child)?,
        UserIntent::ActivateGhost { container } => plan_activate_ghost(ctx, &container)?,
        UserIntent::CreateManualEdge {
            source,
            target,
            relation,
            direction,
            metadata,
        } => plan_manual_edge(ctx, source, target, relation, direction, metadata)?,
        UserIntent::DeleteEdge { edge } => plan_delete_edge(ctx, &edge)?,
        UserIntent::DeleteObject { container } => plan_delete_object(ctx, &container)?,
        UserIntent::ResetLayout => plan_reset_layout(ctx)?,
        UserIntent::AcquireLock { ttl_ms } => plan_acquire_lock(ctx, ttl_ms)?,
        UserIntent::RenewLock { ttl_ms } => plan_renew_lock(ctx, ttl_ms)?,
        UserIntent::ReleaseLock => plan_release_lock(ctx)?,
        UserIntent::CreateObject {
            title,
            body,
            position,
            size,
            parent,
            metadata,
        } => plan_create_object(ctx, title, body, position, size, parent, metadata)?,
        UserIntent::CreateIntegratedObject {
            entity_type,
            title,
            body,
            position,
            size,
            parent_entity,
        } => plan_create_integrated(ctx, entity_type, title, body, position, size, parent_entity)?,
        UserIntent::UpdateObject { container, patch } => plan_update_object(ctx, &container, patch)?,
        UserIntent::UpdateMetadata {
            container,
            set,
            remove,
        } => plan_update_metadata(ctx, &container, set, remove)?,
        UserIntent::SetVisibility {
            container,
            hidden,
            collapsed,
        } => plan_set_visibility(ctx, &container, hidden, collapsed)?,
    };
    if let Some(plan) = planned.plan.as_mut() {
        plan.annotate("intent", kind);
    }
    Ok(planned)
}

fn stamp(ctx: &PlanContext<'_>) -> Stamp {
    Stamp::new(ctx.now, ctx.actor.clone())
}

fn require_finite(position: &Position) -> Result<(), PlanError> {
    if position.x.is_finite() && position.y.is_finite() {
        Ok(())
    } else {
        Err(PlanError::ValidationFailed {
            field: "position".into(),
            reason: "coordinates must be finite".into(),
        })
    }
}

/// The first manual reposition or renest permanently breaks auto
/// layout; record that in the same plan.
fn break_layout(plan: &mut Plan, ctx: &PlanContext<'_>) {
    let mut flag = ctx.state.layout_for(ctx.workspace);
    if !flag.broken {
        flag.broken = true;
        plan.push(PlannedMutation::bare(Mutation::SetLayoutFlag { flag }));
    }
}

fn plan_move(
    ctx: &PlanContext<'_>,
    container: &ContainerId,
    position: Position,
) -> Result<Planned, PlanError> {
    require_finite(&position)?;
    let current = require_container(ctx.state, container)?;
    if current.position == position {
        return Ok(Planned::noop(vec![Warning::NoEffect {
            reason: format!("container {container} is already at the requested position"),
        }]));
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::UpdateContainer {
        id: container.clone(),
        patch: ContainerPatch {
            position: Some(position),
            ..Default::default()
        },
    }));
    break_layout(&mut plan, ctx);
    plan.push_event(DomainEvent::ContainerUpdated {
        workspace: ctx.workspace.clone(),
        container: container.clone(),
        fields: vec![FieldName::Position],
    });
    Ok(Planned::of(plan))
}

fn plan_resize(
    ctx: &PlanContext<'_>,
    container: &ContainerId,
    size: Size,
) -> Result<Planned, PlanError> {
    if !size.is_valid() {
        return Err(PlanError::ValidationFailed {
            field: "size".into(),
            reason: "width and height must be positive and finite".into(),
        });
    }
    let current = require_container(ctx.state, container)?;
    if current.size == size {
        return Ok(Planned::noop(vec![Warning::NoEffect {
            reason: format!("container {container} already has the requested size"),
        }]));
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::UpdateContainer {
        id: container.clone(),
        patch: ContainerPatch {
            size: Some(size),
            ..Default::default()
        },
    }));
    plan.push_event(DomainEvent::ContainerUpdated {
        workspace: ctx.workspace.clone(),
        container: container.clone(),
        fields: vec![FieldName::Size],
    });
    Ok(Planned::of(plan))
}

fn plan_nest(
    ctx: &PlanContext<'_>,
    child: &ContainerId,
    parent: &ContainerId,
) -> Result<Planned, PlanError> {
    let current = require_container(ctx.state, child)?;
    require_container(ctx.state, parent)?;
    if current.parent.as_ref() == Some(parent) {
        return Ok(Planned::noop(vec![Warning::NoEffect {
            reason: format!("container {child} is already nested under {parent}"),
        }]));
    }
    if ctx.state.would_create_nest_cycle(child, parent) {
        return Err(PlanError::NestCycle {
            child: child.clone(),
            parent: parent.clone(),
        });
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::UpdateContainer {
        id: child.clone(),
        patch: ContainerPatch {
            parent: Patch::Set(parent.clone()),
            ..Default::default()
        },
    }));
    break_layout(&mut plan, ctx);
    plan.push_event(DomainEvent::ContainerUpdated {
        workspace: ctx.workspace.clone(),
        container: child.clone(),
        fields: vec![FieldName::Parent],
    });
    Ok(Planned::of(plan))
}

fn plan_unnest(ctx: &PlanContext<'_>, child: &ContainerId) -> Result<Planned, PlanError> {
    let current = require_container(ctx.state, child)?;
    if current.parent.is_none() {
        return Ok(Planned::noop(vec![Warning::NoEffect {
            reason: format!("container {child} has no parent"),
        }]));
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::UpdateContainer {
        id: child.clone(),
        patch: ContainerPatch {
            parent: Patch::Clear,
            ..Default::default()
        },
    }));
    break_layout(&mut plan, ctx);
    plan.push_event(DomainEvent::ContainerUpdated {
        workspace: ctx.workspace.clone(),
        container: child.clone(),
        fields: vec![FieldName::Parent],
    });
    Ok(Planned::of(plan))
}

fn plan_activate_ghost(
    ctx: &PlanContext<'_>,
    container: &ContainerId,
) -> Result<Planned, PlanError> {
    let current = require_container(ctx.state, container)?;
    if !current.is_ghost {
        return Ok(Planned::noop(vec![Warning::NoEffect {
            reason: format!("container {container} is already activated"),
        }]));
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::UpdateContainer {
        id: container.clone(),
        patch: ContainerPatch {
            is_ghost: Some(false),
            ..Default::default()
        },
    }));
    plan.push_event(DomainEvent::GhostActivated {
        workspace: ctx.workspace.clone(),
        container: container.clone(),
    });
    Ok(Planned::of(plan))
}

fn plan_manual_edge(
    ctx: &PlanContext<'_>,
    source: PortId,
    target: PortId,
    relation: RelationKind,
    direction: EdgeDirection,
    metadata: BTreeMap<String, String>,
) -> Result<Planned, PlanError> {
    if ctx.state.ports.get(&source).is_none() {
        return Err(PlanError::PortNotFound(source));
    }
    if ctx.state.ports.get(&target).is_none() {
        return Err(PlanError::PortNotFound(target));
    }
    if ctx.state.edges.between(&source, &target).is_some() {
        return Err(PlanError::EdgeExists {
            a: source,
            b: target,
        });
    }
    enforce_metadata_limits(&metadata, ctx.limits)?;

    let edge = RelationshipEdge::new(
        EdgeId::generate(),
        ctx.workspace.clone(),
        source,
        target,
        relation,
        direction,
        false,
        metadata,
    )?;
    let edge_id = edge.id.clone();

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::CreateEdge { edge }));
    plan.push_event(DomainEvent::EdgeCreated {
        workspace: ctx.workspace.clone(),
        edge: edge_id,
        relation,
        auto_generated: false,
    });
    Ok(Planned::of(plan))
}

fn plan_delete_edge(
    ctx: &PlanContext<'_>,
    edge: &EdgeId,
) -> Result<Planned, PlanError> {
    if ctx.state.edges.get(edge).is_none() {
        return Err(PlanError::EdgeNotFound(edge.clone()));
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::DeleteEdge {
        id: edge.clone(),
    }));
    plan.push_event(DomainEvent::EdgeDeleted {
        workspace: ctx.workspace.clone(),
        edge: edge.clone(),
    });
    Ok(Planned::of(plan))
}

/// Cascade: edges touching the container's ports, then the ports, then
/// the reference, then re-parent children, then the container itself.
pub(crate) fn push_container_cascade(plan: &mut Plan, ctx: &PlanContext<'_>, id: &ContainerId) {
    for edge in ctx.state.edges_touching_container(id) {
        plan.push(PlannedMutation::bare(Mutation::DeleteEdge {
            id: edge.id.clone(),
        }));
    }
    for port in ctx.state.ports.owned_by(id) {
        plan.push(PlannedMutation::bare(Mutation::DeletePort {
            id: port.id.clone(),
        }));
    }
    if let Some(reference) = ctx.state.references.for_container(id) {
        plan.push(PlannedMutation::bare(Mutation::DetachReference {
            id: reference.id.clone(),
        }));
    }
    for child in ctx.state.containers.children_of(id) {
        plan.push(PlannedMutation::bare(Mutation::UpdateContainer {
            id: child.id.clone(),
            patch: ContainerPatch {
                parent: Patch::Clear,
                ..Default::default()
            },
        }));
    }
    plan.push(PlannedMutation::bare(Mutation::DeleteContainer {
        id: id.clone(),
    }));
}

fn plan_delete_object(ctx: &PlanContext<'_>, container: &ContainerId) -> Result<Planned, PlanError> {
    require_container(ctx.state, container)?;

    let mut plan = Plan::new(ctx.workspace.clone());
    push_container_cascade(&mut plan, ctx, container);
    plan.push_event(DomainEvent::ContainerDeleted {
        workspace: ctx.workspace.clone(),
        container: container.clone(),
    });
    Ok(Planned::of(plan))
}

fn plan_reset_layout(ctx: &PlanContext<'_>) -> Result<Planned, PlanError> {
    let mut plan = Plan::new(ctx.workspace.clone());
    for (id, position) in layout::ghost_placements(ctx.state) {
        let Some(container) = ctx.state.containers.get(&id) else {
            continue;
        };
        if !layout::moves_container(container, &position) {
            continue;
        }
        plan.push(PlannedMutation::bare(Mutation::UpdateContainer {
            id,
            patch: ContainerPatch {
                position: Some(position),
                ..Default::default()
            },
        }));
    }

    let mut flag = ctx.state.layout_for(ctx.workspace);
    flag.broken = false;
    flag.last_reset = Some(ctx.now);
    plan.push(PlannedMutation::bare(Mutation::SetLayoutFlag { flag }));
    plan.push_event(DomainEvent::LayoutReset {
        workspace: ctx.workspace.clone(),
    });
    Ok(Planned::of(plan))
}

fn plan_acquire_lock(ctx: &PlanContext<'_>, ttl_ms: Option<u64>) -> Result<Planned, PlanError> {
    let ttl = ttl_ms.unwrap_or(ctx.limits.default_lock_ttl_ms);
    let lock = CanvasLock::new(
        ctx.workspace.clone(),
        ctx.actor.clone(),
        ctx.now.saturating_add_ms(ttl),
    );

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::AcquireLock { lock }));
    plan.push_event(DomainEvent::LockAcquired {
        workspace: ctx.workspace.clone(),
        holder: ctx.actor.clone(),
    });
    Ok(Planned::of(plan))
}

fn plan_renew_lock(ctx: &PlanContext<'_>, ttl_ms: Option<u64>) -> Result<Planned, PlanError> {
    let ttl = ttl_ms.unwrap_or(ctx.limits.default_lock_ttl_ms);

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::RenewLock {
        workspace: ctx.workspace.clone(),
        holder: ctx.actor.clone(),
        expires: ctx.now.saturating_add_ms(ttl),
    }));
    Ok(Planned::of(plan))
}

fn plan_release_lock(ctx: &PlanContext<'_>) -> Result<Planned, PlanError> {
    if ctx.state.lock.is_none() {
        return Ok(Planned::noop(vec![Warning::NoEffect {
            reason: "no lock is held on this workspace".into(),
        }]));
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::ReleaseLock {
        workspace: ctx.workspace.clone(),
        holder: ctx.actor.clone(),
    }));
    plan.push_event(DomainEvent::LockReleased {
        workspace: ctx.workspace.clone(),
        holder: ctx.actor.clone(),
    });
    Ok(Planned::of(plan))
}

/// Default in/out ports for a new container; every container gets them
/// so edges always have endpoints to bind to.
fn push_default_ports(plan: &mut Plan, ctx: &PlanContext<'_>, owner: &ContainerId) -> (PortId, PortId) {
    let input = Port {
        id: PortId::generate(),
        workspace: ctx.workspace.clone(),
        owner: owner.clone(),
        name: "in".into(),
        kind: PortKind::Input,
    };
    let output = Port {
        id: PortId::generate(),
        workspace: ctx.workspace.clone(),
        owner: owner.clone(),
        name: "out".into(),
        kind: PortKind::Output,
    };
    let ids = (input.id.clone(), output.id.clone());
    plan.push(PlannedMutation::bare(Mutation::CreatePort { port: input }));
    plan.push(PlannedMutation::bare(Mutation::CreatePort { port: output }));
    ids
}

#[allow(clippy::too_many_arguments)]
fn plan_create_object(
    ctx: &PlanContext<'_>,
    title: Option<String>,
    body: Option<String>,
    position: Position,
    size: Size,
    parent: Option<ContainerId>,
    metadata: BTreeMap<String, String>,
) -> Result<Planned, PlanError> {
    require_finite(&position)?;
    if !size.is_valid() {
        return Err(PlanError::ValidationFailed {
            field: "size".into(),
            reason: "width and height must be positive and finite".into(),
        });
    }
    enforce_text_limit("title bytes", title.as_deref(), ctx.limits.max_title_bytes)?;
    enforce_text_limit("body bytes", body.as_deref(), ctx.limits.max_body_bytes)?;
    enforce_metadata_limits(&metadata, ctx.limits)?;
    if let Some(parent) = parent.as_ref() {
        require_container(ctx.state, parent)?;
    }

    let mut container = Container::new(
        ContainerId::generate(),
        ctx.workspace.clone(),
        title,
        body,
        position,
        size,
        parent,
        false,
        None,
        stamp(ctx),
    )?;
    container.metadata = metadata;
    let id = container.id.clone();

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::repaired(Mutation::CreateContainer {
        container,
    }));
    push_default_ports(&mut plan, ctx, &id);
    plan.push_event(DomainEvent::ContainerCreated {
        workspace: ctx.workspace.clone(),
        container: id,
        integrated: false,
        entity: None,
    });
    Ok(Planned::of(plan))
}

#[allow(clippy::too_many_arguments)]
fn plan_create_integrated(
    ctx: &PlanContext<'_>,
    entity_type: EntityType,
    title: String,
    body: Option<String>,
    position: Position,
    size: Size,
    parent_entity: Option<EntityKey>,
) -> Result<Planned, PlanError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(PlanError::ValidationFailed {
            field: "title".into(),
            reason: "title cannot be empty".into(),
        });
    }
    require_finite(&position)?;
    if !size.is_valid() {
        return Err(PlanError::ValidationFailed {
            field: "size".into(),
            reason: "width and height must be positive and finite".into(),
        });
    }
    enforce_text_limit("title bytes", Some(title.as_str()), ctx.limits.max_title_bytes)?;
    enforce_text_limit("body bytes", body.as_deref(), ctx.limits.max_body_bytes)?;

    // About to materialize a mirror: the workspace-wide duplicate gate
    // applies here exactly as it does for inbound materialization.
    ctx.recon.ensure_no_duplicates()?;

    let entity = EntityKey::new(entity_type, EntityId::generate());
    let container = Container::new(
        ContainerId::generate(),
        ctx.workspace.clone(),
        Some(title.clone()),
        body,
        position,
        size,
        None,
        false,
        Some(entity.clone()),
        stamp(ctx),
    )?;
    let id = container.id.clone();
    let reference = Reference::single(ctx.workspace.clone(), id.clone(), entity.clone())?;

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::repaired(Mutation::CreateContainer {
        container,
    }));
    push_default_ports(&mut plan, ctx, &id);
    plan.push(PlannedMutation::bare(Mutation::AttachReference { reference }));
    plan.push(PlannedMutation::bare(Mutation::CreateAuthoritativeEntity {
        entity: entity.clone(),
        title,
        container: id.clone(),
    }));
    if let Some(parent) = parent_entity {
        plan.push(PlannedMutation::bare(Mutation::LinkAuthoritativeChild {
            parent,
            child: entity.clone(),
        }));
    }

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
    Ok(Planned::of(plan))
}

fn plan_update_object(
    ctx: &PlanContext<'_>,
    container: &ContainerId,
    patch: ContainerPatch,
) -> Result<Planned, PlanError> {
    let current = require_container(ctx.state, container)?;
    if current.is_ghost {
        return Err(PlanError::GhostReadOnly(container.clone()));
    }
    if patch.is_ghost.is_some() {
        return Err(PlanError::ValidationFailed {
            field: "is_ghost".into(),
            reason: "ghost state changes only through activate_ghost".into(),
        });
    }
    if !patch.parent.is_keep() {
        return Err(PlanError::ValidationFailed {
            field: "parent".into(),
            reason: "re-parenting only through nest/unnest".into(),
        });
    }
    if let Patch::Set(title) = patch.title.as_ref() {
        enforce_text_limit("title bytes", Some(title.as_str()), ctx.limits.max_title_bytes)?;
    }
    if let Patch::Set(body) = patch.body.as_ref() {
        enforce_text_limit("body bytes", Some(body.as_str()), ctx.limits.max_body_bytes)?;
    }
    if let Patch::Set(metadata) = patch.metadata.as_ref() {
        enforce_metadata_limits(metadata, ctx.limits)?;
    }

    // Dry-run against a probe copy so the content invariant is rejected
    // here, before any I/O, and so the event can name changed fields.
    let mut normalized = patch.clone();
    normalized.normalize_nulls();
    let mut probe = current.clone();
    let changed = probe.apply_patch(&normalized, stamp(ctx))?;
    if changed.is_empty() {
        return Ok(Planned::noop(vec![Warning::NoEffect {
            reason: format!("no field of container {container} would change"),
        }]));
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::repaired(Mutation::UpdateContainer {
        id: container.clone(),
        patch,
    }));
    plan.push_event(DomainEvent::ContainerUpdated {
        workspace: ctx.workspace.clone(),
        container: container.clone(),
        fields: changed,
    });
    Ok(Planned::of(plan))
}

fn plan_update_metadata(
    ctx: &PlanContext<'_>,
    container: &ContainerId,
    set: BTreeMap<String, String>,
    remove: Vec<String>,
) -> Result<Planned, PlanError> {
    let current = require_container(ctx.state, container)?;
    if current.is_ghost {
        return Err(PlanError::GhostReadOnly(container.clone()));
    }

    let mut merged = current.metadata.clone();
    for (key, value) in set {
        merged.insert(key, value);
    }
    for key in &remove {
        merged.remove(key);
    }
    enforce_metadata_limits(&merged, ctx.limits)?;
    if merged == current.metadata {
        return Ok(Planned::noop(vec![Warning::NoEffect {
            reason: format!("metadata of container {container} is unchanged"),
        }]));
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::UpdateContainer {
        id: container.clone(),
        patch: ContainerPatch {
            metadata: Patch::Set(merged),
            ..Default::default()
        },
    }));
    plan.push_event(DomainEvent::ContainerUpdated {
        workspace: ctx.workspace.clone(),
        container: container.clone(),
        fields: vec![FieldName::Metadata],
    });
    Ok(Planned::of(plan))
}

fn plan_set_visibility(
    ctx: &PlanContext<'_>,
    container: &ContainerId,
    hidden: Option<bool>,
    collapsed: Option<bool>,
) -> Result<Planned, PlanError> {
    require_container(ctx.state, container)?;
    if hidden.is_none() && collapsed.is_none() {
        return Ok(Planned::noop(vec![Warning::NoEffect {
            reason: "neither hidden nor collapsed was supplied".into(),
        }]));
    }

    let current = ctx
        .state
        .visibility
        .iter()
        .find(|v| &v.user == ctx.actor && &v.container == container);
    let setting = VisibilitySetting {
        workspace: ctx.workspace.clone(),
        user: ctx.actor.clone(),
        container: container.clone(),
        hidden: hidden.unwrap_or_else(|| current.map(|v| v.hidden).unwrap_or(false)),
        collapsed: collapsed.unwrap_or_else(|| current.map(|v| v.collapsed).unwrap_or(false)),
    };
    if let Some(current) = current
        && current.hidden == setting.hidden
        && current.collapsed == setting.collapsed
    {
        return Ok(Planned::noop(vec![Warning::NoEffect {
            reason: format!("visibility of container {container} is unchanged"),
        }]));
    }

    let mut plan = Plan::new(ctx.workspace.clone());
    plan.push(PlannedMutation::bare(Mutation::PutVisibility { setting }));
    plan.push_event(DomainEvent::VisibilityChanged {
        workspace: ctx.workspace.clone(),
        user: ctx.actor.clone(),
        container: container.clone(),
    });
    Ok(Planned::of(plan))
}
