//! Layer 7: The canvas lock.
//!
//! At most one per workspace. Advisory at the data layer, enforced as a
//! hard precondition by the execution engine. Expiry is wall-clock only.

use serde::{Deserialize, Serialize};

use super::identity::{ActorId, WorkspaceId};
use super::time::WallClock;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasLock {
    pub workspace: WorkspaceId,
    pub holder: ActorId,
    pub expires: WallClock,
}

impl CanvasLock {
    pub fn new(workspace: WorkspaceId, holder: ActorId, expires: WallClock) -> Self {
        Self {
            workspace,
            holder,
            expires,
        }
    }

    pub fn is_expired(&self, now: WallClock) -> bool {
        self.expires <= now
    }

    /// Non-expired and held by `actor`.
    pub fn held_by(&self, actor: &ActorId, now: WallClock) -> bool {
        !self.is_expired(now) && &self.holder == actor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_wall_clock() {
        let lock = CanvasLock::new(
            WorkspaceId::new("w1").unwrap(),
            ActorId::new("alice").unwrap(),
            WallClock(1_000),
        );
        assert!(!lock.is_expired(WallClock(999)));
        assert!(lock.is_expired(WallClock(1_000)));
        assert!(lock.is_expired(WallClock(2_000)));
    }

    #[test]
    fn held_by_requires_holder_and_liveness() {
        let alice = ActorId::new("alice").unwrap();
        let bob = ActorId::new("bob").unwrap();
        let lock = CanvasLock::new(WorkspaceId::new("w1").unwrap(), alice.clone(), WallClock(1_000));
        assert!(lock.held_by(&alice, WallClock(500)));
        assert!(!lock.held_by(&bob, WallClock(500)));
        assert!(!lock.held_by(&alice, WallClock(1_500)));
    }
}
