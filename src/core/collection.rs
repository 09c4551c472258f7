//! The sealed set of persisted collections, split by authority.
//!
//! Every mutation maps to exactly one collection, and every collection
//! has an explicit allow/deny classification. A new collection cannot
//! compile without one: `authority()` is match-exhaustive on purpose.

use serde::{Deserialize, Serialize};

/// Which domain owns a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// The visualization layer; writes allowed through plans.
    Derived,
    /// The source of truth; writes denied except the two controlled
    /// exceptions, and only when paired inside an integrated-object
    /// creation plan.
    Authoritative,
}

/// Every persisted collection either side of the authority boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCollection {
    // Derivative (allow-list)
    Containers,
    References,
    Ports,
    Edges,
    VisibilitySettings,
    CanvasLocks,
    LayoutFlags,
    TelemetryEvents,
    // Authoritative (deny-list)
    Projects,
    Tracks,
    Tasks,
    Events,
}

impl TargetCollection {
    pub fn authority(self) -> Authority {
        match self {
            Self::Containers
            | Self::References
            | Self::Ports
            | Self::Edges
            | Self::VisibilitySettings
            | Self::CanvasLocks
            | Self::LayoutFlags
            | Self::TelemetryEvents => Authority::Derived,
            Self::Projects | Self::Tracks | Self::Tasks | Self::Events => Authority::Authoritative,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Containers => "containers",
            Self::References => "references",
            Self::Ports => "ports",
            Self::Edges => "edges",
            Self::VisibilitySettings => "visibility_settings",
            Self::CanvasLocks => "canvas_locks",
            Self::LayoutFlags => "layout_flags",
            Self::TelemetryEvents => "telemetry_events",
            Self::Projects => "projects",
            Self::Tracks => "tracks",
            Self::Tasks => "tasks",
            Self::Events => "events",
        }
    }
}

impl std::fmt::Display for TargetCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl super::domain::EntityType {
    /// The authoritative collection an entity type lives in.
    pub fn collection(self) -> TargetCollection {
        match self {
            Self::Project => TargetCollection::Projects,
            Self::Track => TargetCollection::Tracks,
            Self::Task => TargetCollection::Tasks,
            Self::Event => TargetCollection::Events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authoritative_collections_are_denied() {
        for c in [
            TargetCollection::Projects,
            TargetCollection::Tracks,
            TargetCollection::Tasks,
            TargetCollection::Events,
        ] {
            assert_eq!(c.authority(), Authority::Authoritative);
        }
        assert_eq!(TargetCollection::Containers.authority(), Authority::Derived);
        assert_eq!(TargetCollection::CanvasLocks.authority(), Authority::Derived);
    }
}
