//! Layer 5: Ports - typed named connection points.
//!
//! Purely structural; deleted only via cascade with the owning container.

use serde::{Deserialize, Serialize};

use super::domain::PortKind;
use super::error::{CoreError, InvalidValue};
use super::identity::{ContainerId, PortId, WorkspaceId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub workspace: WorkspaceId,
    pub owner: ContainerId,
    pub name: String,
    pub kind: PortKind,
}

impl Port {
    pub fn new(
        id: PortId,
        workspace: WorkspaceId,
        owner: ContainerId,
        name: impl Into<String>,
        kind: PortKind,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InvalidValue {
                field: "port name",
                raw: name,
            }
            .into());
        }
        Ok(Self {
            id,
            workspace,
            owner,
            name,
            kind,
        })
    }
}
