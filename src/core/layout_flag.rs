//! The persisted layout flag.
//!
//! One boolean per workspace ("default layout broken") plus the last
//! reset timestamp. This is the entire persisted configuration surface
//! the core owns.

use serde::{Deserialize, Serialize};

use super::identity::WorkspaceId;
use super::time::WallClock;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFlag {
    pub workspace: WorkspaceId,
    pub broken: bool,
    pub last_reset: Option<WallClock>,
}

impl LayoutFlag {
    pub fn pristine(workspace: WorkspaceId) -> Self {
        Self {
            workspace,
            broken: false,
            last_reset: None,
        }
    }

    pub fn broken(workspace: WorkspaceId) -> Self {
        Self {
            workspace,
            broken: true,
            last_reset: None,
        }
    }
}
