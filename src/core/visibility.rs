//! Per-user visibility settings for containers.
//!
//! One row per (workspace, user, container). The rendering collaborator
//! reads these; the core only writes them through plans.

use serde::{Deserialize, Serialize};

use super::identity::{ActorId, ContainerId, WorkspaceId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilitySetting {
    pub workspace: WorkspaceId,
    pub user: ActorId,
    pub container: ContainerId,
    pub hidden: bool,
    pub collapsed: bool,
}

impl VisibilitySetting {
    pub fn key(&self) -> (WorkspaceId, ActorId, ContainerId) {
        (
            self.workspace.clone(),
            self.user.clone(),
            self.container.clone(),
        )
    }
}
