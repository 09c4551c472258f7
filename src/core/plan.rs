//! Plans: ordered, validated mutation lists.
//!
//! Plans are ephemeral - generated, executed or discarded, never
//! queued. Events ride along and are emitted only after every mutation
//! succeeds.

use std::collections::BTreeMap;

use super::event::DomainEvent;
use super::identity::{PlanId, WorkspaceId};
use super::mutation::{Mutation, PlannedMutation};

#[derive(Clone, Debug)]
pub struct Plan {
    pub id: PlanId,
    pub workspace: WorkspaceId,
    pub mutations: Vec<PlannedMutation>,
    pub events: Vec<DomainEvent>,
    pub metadata: BTreeMap<String, String>,
}

impl Plan {
    pub fn new(workspace: WorkspaceId) -> Self {
        Self {
            id: PlanId::generate(),
            workspace,
            mutations: Vec::new(),
            events: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, mutation: PlannedMutation) {
        self.mutations.push(mutation);
    }

    pub fn push_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// True when every mutation targets the lock collection; such plans
    /// are exempt from the holder gate (acquisition cannot require the
    /// lock it creates).
    pub fn is_lock_only(&self) -> bool {
        !self.mutations.is_empty()
            && self.mutations.iter().all(|m| {
                matches!(
                    m.op,
                    Mutation::AcquireLock { .. }
                        | Mutation::RenewLock { .. }
                        | Mutation::ReleaseLock { .. }
                )
            })
    }
}
