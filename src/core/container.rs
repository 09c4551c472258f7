//! Layer 3: The Container (visualization object)
//!
//! A container mirrors an authoritative entity (integrated, starts as
//! ghost) or exists local-only. It must always keep at least one of
//! title/body non-empty, on create and on every update.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{ContentInvariant, CoreError};
use super::identity::{ContainerId, WorkspaceId};
use super::patch::Patch;
use super::reference::EntityKey;
use super::time::Stamp;

/// Canvas position, pixels, freeform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Container extent, pixels. Must be strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// Container field names, used in content-free domain events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Title,
    Body,
    Position,
    Size,
    Parent,
    Ghost,
    Metadata,
}

/// A visualization object on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub workspace: WorkspaceId,
    pub title: Option<String>,
    pub body: Option<String>,
    pub position: Position,
    pub size: Size,
    pub parent: Option<ContainerId>,
    pub is_ghost: bool,
    /// Denormalized authoritative linkage; the reference table is the
    /// persisted source for the reconciliation map.
    pub origin: Option<EntityKey>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    pub created: Stamp,
    pub updated: Stamp,
}

impl Container {
    /// Build a container, enforcing the content invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ContainerId,
        workspace: WorkspaceId,
        title: Option<String>,
        body: Option<String>,
        position: Position,
        size: Size,
        parent: Option<ContainerId>,
        is_ghost: bool,
        origin: Option<EntityKey>,
        stamp: Stamp,
    ) -> Result<Self, CoreError> {
        let title = non_empty(title);
        let body = non_empty(body);
        if title.is_none() && body.is_none() {
            return Err(ContentInvariant {
                container: id.to_string(),
            }
            .into());
        }
        Ok(Self {
            id,
            workspace,
            title,
            body,
            position,
            size,
            parent,
            is_ghost,
            origin,
            metadata: BTreeMap::new(),
            created: stamp.clone(),
            updated: stamp,
        })
    }

    /// Integrated = carries an authoritative backing.
    pub fn is_integrated(&self) -> bool {
        self.origin.is_some()
    }

    /// Apply a patch, re-enforcing the content invariant.
    ///
    /// Returns the names of fields that actually changed.
    pub fn apply_patch(
        &mut self,
        patch: &ContainerPatch,
        stamp: Stamp,
    ) -> Result<Vec<FieldName>, CoreError> {
        let next_title = patch.title.clone().apply(self.title.clone());
        let next_body = patch.body.clone().apply(self.body.clone());
        let next_title = non_empty(next_title);
        let next_body = non_empty(next_body);
        if next_title.is_none() && next_body.is_none() {
            return Err(ContentInvariant {
                container: self.id.to_string(),
            }
            .into());
        }

        let mut changed = Vec::new();
        if next_title != self.title {
            self.title = next_title;
            changed.push(FieldName::Title);
        } else {
            self.title = next_title;
        }
        if next_body != self.body {
            self.body = next_body;
            changed.push(FieldName::Body);
        } else {
            self.body = next_body;
        }
        if let Some(pos) = patch.position {
            if pos != self.position {
                self.position = pos;
                changed.push(FieldName::Position);
            }
        }
        if let Some(size) = patch.size {
            if size != self.size {
                self.size = size;
                changed.push(FieldName::Size);
            }
        }
        match &patch.parent {
            Patch::Set(parent) => {
                if self.parent.as_ref() != Some(parent) {
                    self.parent = Some(parent.clone());
                    changed.push(FieldName::Parent);
                }
            }
            Patch::Clear => {
                if self.parent.is_some() {
                    self.parent = None;
                    changed.push(FieldName::Parent);
                }
            }
            Patch::Keep => {}
        }
        if let Some(ghost) = patch.is_ghost {
            if ghost != self.is_ghost {
                self.is_ghost = ghost;
                changed.push(FieldName::Ghost);
            }
        }
        if let Patch::Set(metadata) = &patch.metadata {
            if metadata != &self.metadata {
                self.metadata = metadata.clone();
                changed.push(FieldName::Metadata);
            }
        } else if matches!(patch.metadata, Patch::Clear) && !self.metadata.is_empty() {
            self.metadata.clear();
            changed.push(FieldName::Metadata);
        }

        if !changed.is_empty() {
            self.updated = stamp;
        }
        Ok(changed)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Partial update for container fields.
///
/// All fields default to no change. The engine's null-normalization
/// repair rewrites whitespace-only Set patches into Clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerPatch {
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub title: Patch<String>,

    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub body: Patch<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,

    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub parent: Patch<ContainerId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_ghost: Option<bool>,

    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub metadata: Patch<BTreeMap<String, String>>,
}

impl ContainerPatch {
    /// Check if this patch has any changes.
    pub fn is_empty(&self) -> bool {
        self.title.is_keep()
            && self.body.is_keep()
            && self.position.is_none()
            && self.size.is_none()
            && self.parent.is_keep()
            && self.is_ghost.is_none()
            && self.metadata.is_keep()
    }

    /// The null-normalization repair: whitespace-only Set becomes Clear.
    pub fn normalize_nulls(&mut self) {
        if let Patch::Set(s) = &self.title
            && s.trim().is_empty()
        {
            self.title = Patch::Clear;
        }
        if let Patch::Set(s) = &self.body
            && s.trim().is_empty()
        {
            self.body = Patch::Clear;
        }
    }
}
