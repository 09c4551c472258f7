//! The orchestration engine.
//!
//! - planner: shared generator contract (Planned, PlanError, warnings)
//! - intent_planner / event_planner: the two plan generators
//! - executor: the only writer, with the failure taxonomy
//! - history + rollback: bounded records and best-effort undo
//! - layout: default placement and the auto-layout gate
//! - orchestrator: composition

pub mod clock;
pub mod event_planner;
pub mod executor;
pub mod history;
pub mod intent_planner;
pub mod layout;
pub mod orchestrator;
pub mod planner;
pub mod rollback;

pub use clock::Clock;
pub use event_planner::plan_authoritative_event;
pub use executor::{ExecError, ExecOutcome, Executor, FailureKind};
pub use history::{ExecutionHistory, HISTORY_CAP, StoredExecutionRecord};
pub use intent_planner::plan_intent;
pub use layout::{default_size, ghost_placements, grid_position, may_auto_layout, placement_for_new};
pub use orchestrator::{Orchestrated, Orchestrator};
pub use planner::{PlanContext, PlanError, Planned, Warning};
pub use rollback::{RollbackOutcome, rollback_last};
