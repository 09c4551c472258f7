//! Pure composition: intent/event → generator → executor → result.
//!
//! The orchestrator owns the injected collaborators and contains no
//! domain logic of its own.

use crate::core::{
    ActorId, AuthoritativeEvent, DomainEvent, Limits, PlanId, ReconciliationMap, UserIntent,
    WorkspaceId,
};
use crate::engine::clock::Clock;
use crate::engine::executor::Executor;
use crate::engine::history::ExecutionHistory;
use crate::engine::planner::{PlanContext, Planned, Warning};
use crate::engine::{event_planner, intent_planner, rollback};
use crate::store::CanvasStore;
use crate::telemetry::TelemetrySink;
use crate::{Error, Result};

/// Unified result of one orchestrated request.
#[derive(Clone, Debug)]
pub struct Orchestrated {
    /// None when planning concluded there is nothing to do.
    pub plan_id: Option<PlanId>,
    pub applied: usize,
    pub events: Vec<DomainEvent>,
    pub warnings: Vec<Warning>,
}

impl Orchestrated {
    fn noop(warnings: Vec<Warning>) -> Self {
        Self {
            plan_id: None,
            applied: 0,
            events: Vec::new(),
            warnings,
        }
    }
}

pub struct Orchestrator<S: CanvasStore> {
    store: S,
    history: ExecutionHistory,
    clock: Clock,
    limits: Limits,
    telemetry: Option<Box<dyn TelemetrySink>>,
}

impl<S: CanvasStore> Orchestrator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            history: ExecutionHistory::new(),
            clock: Clock::new(),
            limits: Limits::default(),
            telemetry: None,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_telemetry(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }

    /// Handle one user intent end to end.
    pub fn handle_intent(
        &mut self,
        workspace: &WorkspaceId,
        actor: &ActorId,
        intent: UserIntent,
    ) -> Result<Orchestrated> {
        let now = self.clock.now();
        let state = self.store.snapshot(workspace).map_err(Error::Store)?;
        let recon = ReconciliationMap::build(workspace.clone(), state.references.iter().map(|(_, r)| r), now);
        let ctx = PlanContext {
            workspace,
            actor,
            state: &state,
            recon: &recon,
            limits: &self.limits,
            now,
        };
        let planned = intent_planner::plan_intent(intent, &ctx).map_err(Error::Plan)?;
        self.run(planned, actor)
    }

    /// Handle one authoritative-domain change event end to end.
    ///
    /// Inbound sync executes under the sync agent's identity and is
    /// lock-gated like any other writer.
    pub fn handle_event(
        &mut self,
        workspace: &WorkspaceId,
        actor: &ActorId,
        event: AuthoritativeEvent,
    ) -> Result<Orchestrated> {
        let now = self.clock.now();
        let state = self.store.snapshot(workspace).map_err(Error::Store)?;
        let recon = ReconciliationMap::build(workspace.clone(), state.references.iter().map(|(_, r)| r), now);
        let ctx = PlanContext {
            workspace,
            actor,
            state: &state,
            recon: &recon,
            limits: &self.limits,
            now,
        };
        let planned = event_planner::plan_authoritative_event(event, &ctx).map_err(Error::Plan)?;
        self.run(planned, actor)
    }

    /// Roll back the most recently committed plan, best effort.
    pub fn rollback_last(
        &mut self,
        workspace: &WorkspaceId,
        actor: &ActorId,
    ) -> Result<Orchestrated> {
        let outcome = rollback::rollback_last(
            &mut self.store,
            &mut self.history,
            &self.clock,
            workspace,
            actor,
        )
        .map_err(Error::Exec)?;
        Ok(Orchestrated {
            plan_id: outcome.plan_id,
            applied: outcome.undone,
            events: Vec::new(),
            warnings: outcome.warnings,
        })
    }

    fn run(&mut self, planned: Planned, actor: &ActorId) -> Result<Orchestrated> {
        let Planned { plan, warnings } = planned;
        let Some(plan) = plan else {
            return Ok(Orchestrated::noop(warnings));
        };

        let mut executor = Executor::new(
            &mut self.store,
            &mut self.history,
            self.telemetry.as_deref(),
            &mut self.clock,
            self.limits.max_mutations_per_plan,
        );
        let outcome = executor.execute(plan, actor).map_err(Error::Exec)?;

        let mut merged = warnings;
        merged.extend(outcome.warnings);
        Ok(Orchestrated {
            plan_id: Some(outcome.plan_id),
            applied: outcome.applied,
            events: outcome.events,
            warnings: merged,
        })
    }
}
