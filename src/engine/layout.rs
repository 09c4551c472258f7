//! Default spatial placement for mirrored entities.
//!
//! A simple column-wrapped grid. Auto-layout runs only while the
//! workspace's layout flag is pristine; the first manual reposition or
//! renest breaks it, and only an explicit reset re-enables it.

use crate::core::{CanvasState, Container, ContainerId, LayoutFlag, Position, Size};

const GRID_COLS: usize = 4;
const CELL_WIDTH: f64 = 320.0;
const CELL_HEIGHT: f64 = 200.0;
const GUTTER: f64 = 40.0;
const ORIGIN_X: f64 = 80.0;
const ORIGIN_Y: f64 = 80.0;

/// Default container extent for materialized mirrors.
pub fn default_size() -> Size {
    Size::new(CELL_WIDTH, CELL_HEIGHT)
}

/// Whether the materializer may still arrange the canvas.
pub fn may_auto_layout(flag: &LayoutFlag) -> bool {
    !flag.broken
}

/// Grid slot for the `index`-th container.
pub fn grid_position(index: usize) -> Position {
    let col = (index % GRID_COLS) as f64;
    let row = (index / GRID_COLS) as f64;
    Position::new(
        ORIGIN_X + col * (CELL_WIDTH + GUTTER),
        ORIGIN_Y + row * (CELL_HEIGHT + GUTTER),
    )
}

/// Placement for one newly mirrored entity.
///
/// With auto-layout broken we still need somewhere to put the mirror;
/// it lands on the origin slot and the user arranges it by hand.
pub fn placement_for_new(state: &CanvasState, flag: &LayoutFlag) -> (Position, Size) {
    if may_auto_layout(flag) {
        (grid_position(state.containers.len()), default_size())
    } else {
        (grid_position(0), default_size())
    }
}

/// Recomputed grid slots for every ghost mirror, in id order. Manual
/// containers and manual edges are never touched by layout logic.
pub fn ghost_placements(state: &CanvasState) -> Vec<(ContainerId, Position)> {
    state
        .containers
        .iter()
        .filter(|(_, c)| c.is_ghost)
        .enumerate()
        .map(|(index, (id, _))| (id.clone(), grid_position(index)))
        .collect()
}

/// True when a placement differs from where the container already is.
pub fn moves_container(container: &Container, position: &Position) -> bool {
    container.position != *position
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WorkspaceId;

    #[test]
    fn grid_wraps_by_column() {
        let p0 = grid_position(0);
        let p3 = grid_position(3);
        let p4 = grid_position(4);
        assert_eq!(p0.y, p3.y);
        assert!(p4.y > p0.y);
        assert_eq!(p4.x, p0.x);
    }

    #[test]
    fn broken_flag_disables_auto_layout() {
        let ws = WorkspaceId::new("w1").unwrap();
        assert!(may_auto_layout(&LayoutFlag::pristine(ws.clone())));
        assert!(!may_auto_layout(&LayoutFlag::broken(ws)));
    }
}
