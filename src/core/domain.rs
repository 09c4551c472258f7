//! Layer 2: Domain enums
//!
//! EntityType: the authoritative entities we mirror
//! PortKind: input, output, free
//! RelationKind / EdgeDirection: typed relationship edges

use serde::{Deserialize, Serialize};

use super::error::{CoreError, InvalidValue};

/// Authoritative entity classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Project,
    Track,
    Task,
    Event,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Track => "track",
            Self::Task => "task",
            Self::Event => "event",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "project" => Ok(Self::Project),
            "track" => Ok(Self::Track),
            "task" => Ok(Self::Task),
            "event" => Ok(Self::Event),
            other => Err(InvalidValue {
                field: "entity_type",
                raw: other.to_string(),
            }
            .into()),
        }
    }
}

/// Connection point classification on a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    Input,
    Output,
    Free,
}

impl PortKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Free => "free",
        }
    }
}

/// Relationship tag carried by an edge. Structure only, no content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    DependsOn,
    Hierarchy,
    Relates,
    Sequence,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DependsOn => "depends_on",
            Self::Hierarchy => "hierarchy",
            Self::Relates => "relates",
            Self::Sequence => "sequence",
        }
    }
}

/// Edge direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    Forward,
    Bidirectional,
}

impl EdgeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Bidirectional => "bidirectional",
        }
    }
}
