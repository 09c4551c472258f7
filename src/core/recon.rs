//! The reconciliation map: entity → container index with duplicate
//! detection.
//!
//! Built from the persisted reference table of one workspace. A
//! duplicate mapping is data-integrity-critical: it blocks all further
//! materialization for the whole workspace until resolved out-of-band.
//! The system deliberately refuses to auto-merge or auto-delete.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use super::identity::{ContainerId, WorkspaceId};
use super::reference::{EntityKey, Reference};
use super::time::WallClock;

/// Result of a single-entity lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityCheck {
    pub exists: bool,
    /// First container id when any exist (best-effort continuation).
    pub container: Option<ContainerId>,
    pub is_duplicate: bool,
    pub duplicate_ids: Vec<ContainerId>,
}

/// Diagnostic record for one duplicated entity mapping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DuplicateDiagnostic {
    pub workspace: WorkspaceId,
    pub entity: EntityKey,
    pub containers: Vec<ContainerId>,
    pub detected_at: WallClock,
}

/// The hard error raised when any duplicate exists anywhere in the
/// workspace.
#[derive(Clone, Debug, Error)]
#[error("duplicate mapping in {workspace}: {} entities mirrored more than once", .diagnostics.len())]
pub struct DuplicateMapping {
    pub workspace: WorkspaceId,
    pub diagnostics: Vec<DuplicateDiagnostic>,
}

/// One-to-one index between authoritative entities and containers.
#[derive(Clone, Debug)]
pub struct ReconciliationMap {
    workspace: WorkspaceId,
    entries: BTreeMap<EntityKey, Vec<ContainerId>>,
    built_at: WallClock,
}

impl ReconciliationMap {
    /// Build from the full reference set of one workspace.
    pub fn build<'a>(
        workspace: WorkspaceId,
        references: impl IntoIterator<Item = &'a Reference>,
        now: WallClock,
    ) -> Self {
        let mut entries: BTreeMap<EntityKey, Vec<ContainerId>> = BTreeMap::new();
        for reference in references {
            for link in &reference.links {
                let containers = entries.entry(link.entity.clone()).or_default();
                if !containers.contains(&reference.container) {
                    containers.push(reference.container.clone());
                }
            }
        }
        Self {
            workspace,
            entries,
            built_at: now,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up one entity. Length 0 → not exists; 1 → clean; >1 →
    /// exists (first id returned) but flagged duplicate.
    pub fn check_entity(&self, entity: &EntityKey) -> EntityCheck {
        match self.entries.get(entity) {
            None => EntityCheck {
                exists: false,
                container: None,
                is_duplicate: false,
                duplicate_ids: Vec::new(),
            },
            Some(containers) if containers.len() == 1 => EntityCheck {
                exists: true,
                container: containers.first().cloned(),
                is_duplicate: false,
                duplicate_ids: Vec::new(),
            },
            Some(containers) => EntityCheck {
                exists: true,
                container: containers.first().cloned(),
                is_duplicate: true,
                duplicate_ids: containers.clone(),
            },
        }
    }

    /// Full diagnostic sweep across the map.
    pub fn duplicates(&self) -> Vec<DuplicateDiagnostic> {
        self.entries
            .iter()
            .filter(|(_, containers)| containers.len() > 1)
            .map(|(entity, containers)| DuplicateDiagnostic {
                workspace: self.workspace.clone(),
                entity: entity.clone(),
                containers: containers.clone(),
                detected_at: self.built_at,
            })
            .collect()
    }

    /// The system-wide safety gate every materializer must pass: a hard
    /// error if any duplicate exists anywhere in the workspace, not
    /// just for the entity being processed.
    pub fn ensure_no_duplicates(&self) -> Result<(), DuplicateMapping> {
        let diagnostics = self.duplicates();
        if diagnostics.is_empty() {
            Ok(())
        } else {
            Err(DuplicateMapping {
                workspace: self.workspace.clone(),
                diagnostics,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::EntityType;
    use crate::core::identity::{EntityId, ReferenceId};

    fn ws() -> WorkspaceId {
        WorkspaceId::new("w1").unwrap()
    }

    fn track(id: &str) -> EntityKey {
        EntityKey::new(EntityType::Track, EntityId::new(id).unwrap())
    }

    fn reference(container: &ContainerId, entity: EntityKey) -> Reference {
        Reference::single(ws(), container.clone(), entity).unwrap()
    }

    #[test]
    fn empty_map_reports_not_exists() {
        let map = ReconciliationMap::build(ws(), [], WallClock(1));
        let check = map.check_entity(&track("t1"));
        assert!(!check.exists);
        assert!(!check.is_duplicate);
        assert!(map.ensure_no_duplicates().is_ok());
    }

    #[test]
    fn single_mapping_is_clean() {
        let ct = ContainerId::generate();
        let refs = [reference(&ct, track("t1"))];
        let map = ReconciliationMap::build(ws(), refs.iter(), WallClock(1));
        let check = map.check_entity(&track("t1"));
        assert!(check.exists);
        assert_eq!(check.container, Some(ct));
        assert!(!check.is_duplicate);
    }

    #[test]
    fn duplicates_block_the_whole_workspace() {
        let (a, b) = (ContainerId::generate(), ContainerId::generate());
        let refs = [reference(&a, track("t1")), reference(&b, track("t1"))];
        let map = ReconciliationMap::build(ws(), refs.iter(), WallClock(9));

        let check = map.check_entity(&track("t1"));
        assert!(check.exists);
        assert!(check.is_duplicate);
        assert_eq!(check.duplicate_ids.len(), 2);

        let err = map.ensure_no_duplicates().unwrap_err();
        assert_eq!(err.diagnostics.len(), 1);
        assert_eq!(err.diagnostics[0].detected_at, WallClock(9));

        // a different, perfectly clean entity is still gated
        assert!(map.ensure_no_duplicates().is_err());
    }
}
