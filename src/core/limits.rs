//! Canvas safety limits (normative defaults).
//!
//! Values are intentionally explicit about their units to avoid confusion.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_title_bytes: usize,
    pub max_body_bytes: usize,
    pub max_metadata_entries: usize,
    pub max_metadata_key_bytes: usize,
    pub max_metadata_value_bytes: usize,
    pub max_mutations_per_plan: usize,
    pub max_ports_per_container: usize,
    pub default_lock_ttl_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_title_bytes: 4 * 1024,
            max_body_bytes: 64 * 1024,
            max_metadata_entries: 64,
            max_metadata_key_bytes: 128,
            max_metadata_value_bytes: 4 * 1024,
            max_mutations_per_plan: 256,
            max_ports_per_container: 32,
            default_lock_ttl_ms: 5 * 60 * 1000,
        }
    }
}
