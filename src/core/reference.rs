//! Layer 4: References - the persisted container↔entity link table.
//!
//! One reference per container; zero-or-more entity links with exactly
//! one primary when any exist. The reconciliation map is built from the
//! full reference set of a workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::EntityType;
use super::error::{CoreError, PrimaryLinkInvariant};
use super::identity::{ContainerId, EntityId, ReferenceId, WorkspaceId};

/// (entity_type, entity_id) - the unit the one-to-one invariant is over.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
}

impl EntityKey {
    pub fn new(entity_type: EntityType, entity_id: EntityId) -> Self {
        Self {
            entity_type,
            entity_id,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type.as_str(), self.entity_id)
    }
}

/// One authoritative link inside a reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLink {
    #[serde(flatten)]
    pub entity: EntityKey,
    pub primary: bool,
}

impl EntityLink {
    pub fn primary(entity: EntityKey) -> Self {
        Self {
            entity,
            primary: true,
        }
    }

    pub fn secondary(entity: EntityKey) -> Self {
        Self {
            entity,
            primary: false,
        }
    }
}

/// Links exactly one container to zero-or-more authoritative entities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: ReferenceId,
    pub workspace: WorkspaceId,
    pub container: ContainerId,
    pub links: Vec<EntityLink>,
}

impl Reference {
    /// Build a reference, enforcing the single-primary invariant.
    pub fn new(
        id: ReferenceId,
        workspace: WorkspaceId,
        container: ContainerId,
        links: Vec<EntityLink>,
    ) -> Result<Self, CoreError> {
        let primaries = links.iter().filter(|l| l.primary).count();
        if !links.is_empty() && primaries != 1 {
            return Err(PrimaryLinkInvariant {
                container: container.to_string(),
                primaries,
            }
            .into());
        }
        Ok(Self {
            id,
            workspace,
            container,
            links,
        })
    }

    /// Convenience: a reference with a single primary link.
    pub fn single(
        workspace: WorkspaceId,
        container: ContainerId,
        entity: EntityKey,
    ) -> Result<Self, CoreError> {
        Self::new(
            ReferenceId::generate(),
            workspace,
            container,
            vec![EntityLink::primary(entity)],
        )
    }

    pub fn primary_link(&self) -> Option<&EntityLink> {
        self.links.iter().find(|l| l.primary)
    }

    pub fn links_entity(&self, key: &EntityKey) -> bool {
        self.links.iter().any(|l| &l.entity == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> EntityKey {
        EntityKey::new(EntityType::Track, EntityId::new(id).unwrap())
    }

    #[test]
    fn zero_links_is_fine() {
        let r = Reference::new(
            ReferenceId::generate(),
            WorkspaceId::new("w1").unwrap(),
            ContainerId::generate(),
            vec![],
        );
        assert!(r.is_ok());
    }

    #[test]
    fn exactly_one_primary_required() {
        let ws = WorkspaceId::new("w1").unwrap();
        let ct = ContainerId::generate();
        let two = Reference::new(
            ReferenceId::generate(),
            ws.clone(),
            ct.clone(),
            vec![EntityLink::primary(key("t1")), EntityLink::primary(key("t2"))],
        );
        assert!(two.is_err());

        let none = Reference::new(
            ReferenceId::generate(),
            ws,
            ct,
            vec![EntityLink::secondary(key("t1"))],
        );
        assert!(none.is_err());
    }
}
