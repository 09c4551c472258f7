//! Layer 0: Time primitives
//!
//! WallClock for lock expiry and stamping. Expiry comparison is plain
//! wall-clock, there is no liveness probing of a lock holder.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::identity::ActorId;

/// Wall clock in milliseconds since the Unix epoch.
///
/// Copy is fine here - it's just a measurement, not causality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WallClock(pub u64);

impl WallClock {
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(ms)
    }

    pub fn saturating_add_ms(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }
}

/// Stamp = wall time + attribution.
///
/// Containers carry creation/update stamps so diagnostics can say who
/// touched what, and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub at: WallClock,
    pub by: ActorId,
}

impl Stamp {
    pub fn new(at: WallClock, by: ActorId) -> Self {
        Self { at, by }
    }
}

impl PartialOrd for Stamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then_with(|| self.by.cmp(&other.by)) // deterministic tiebreak
    }
}
