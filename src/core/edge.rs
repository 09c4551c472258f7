//! Layer 6: Relationship edges.
//!
//! An edge connects exactly two ports and carries a relation tag and a
//! direction, never semantic content. Metadata keys that look like
//! content fields are rejected on construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{EdgeDirection, RelationKind};
use super::error::{ContentKeyRejected, CoreError, InvalidEndpoints};
use super::identity::{EdgeId, PortId, WorkspaceId};

/// Metadata keys an edge may never carry.
const CONTENT_KEYS: &[&str] = &[
    "title",
    "body",
    "content",
    "text",
    "description",
    "note",
    "notes",
    "comment",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub id: EdgeId,
    pub workspace: WorkspaceId,
    pub source: PortId,
    pub target: PortId,
    pub relation: RelationKind,
    pub direction: EdgeDirection,
    pub auto_generated: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl RelationshipEdge {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EdgeId,
        workspace: WorkspaceId,
        source: PortId,
        target: PortId,
        relation: RelationKind,
        direction: EdgeDirection,
        auto_generated: bool,
        metadata: BTreeMap<String, String>,
    ) -> Result<Self, CoreError> {
        if source == target {
            return Err(InvalidEndpoints {
                reason: "source and target port are the same".into(),
            }
            .into());
        }
        reject_content_keys(&metadata)?;
        Ok(Self {
            id,
            workspace,
            source,
            target,
            relation,
            direction,
            auto_generated,
            metadata,
        })
    }

    pub fn touches_port(&self, port: &PortId) -> bool {
        &self.source == port || &self.target == port
    }
}

/// Reject metadata keys that smell like content fields.
pub fn reject_content_keys(metadata: &BTreeMap<String, String>) -> Result<(), CoreError> {
    for key in metadata.keys() {
        let lowered = key.to_ascii_lowercase();
        if CONTENT_KEYS.iter().any(|c| lowered == *c) {
            return Err(ContentKeyRejected { key: key.clone() }.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> (WorkspaceId, PortId, PortId) {
        (
            WorkspaceId::new("w1").unwrap(),
            PortId::generate(),
            PortId::generate(),
        )
    }

    #[test]
    fn rejects_self_edge() {
        let (ws, a, _) = base();
        let err = RelationshipEdge::new(
            EdgeId::generate(),
            ws,
            a.clone(),
            a,
            RelationKind::Relates,
            EdgeDirection::Forward,
            false,
            BTreeMap::new(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_content_metadata() {
        let (ws, a, b) = base();
        let mut metadata = BTreeMap::new();
        metadata.insert("Description".to_string(), "secret prose".to_string());
        let err = RelationshipEdge::new(
            EdgeId::generate(),
            ws,
            a,
            b,
            RelationKind::DependsOn,
            EdgeDirection::Forward,
            false,
            metadata,
        );
        assert!(err.is_err());
    }

    #[test]
    fn structural_metadata_is_fine() {
        let (ws, a, b) = base();
        let mut metadata = BTreeMap::new();
        metadata.insert("weight".to_string(), "3".to_string());
        let edge = RelationshipEdge::new(
            EdgeId::generate(),
            ws,
            a,
            b,
            RelationKind::Sequence,
            EdgeDirection::Bidirectional,
            false,
            metadata,
        );
        assert!(edge.is_ok());
    }
}
