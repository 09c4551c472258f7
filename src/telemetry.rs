//! Logging init and the post-commit telemetry seam.
//!
//! The engine hands the telemetry collaborator validated, content-free
//! domain events; aggregation and privacy filtering happen on the other
//! side of the trait. Forwarding is fire-and-forget from the engine's
//! perspective - a failing sink degrades to a warning, never a failed
//! transaction.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

use crate::core::DomainEvent;

/// A sink rejecting an event never fails the transaction that produced
/// it.
#[derive(Debug, Error, Clone)]
#[error("telemetry sink rejected event: {reason}")]
pub struct TelemetryError {
    pub reason: String,
}

impl TelemetryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Consumes post-commit domain events.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: &DomainEvent) -> Result<(), TelemetryError>;
}

fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialize tracing for a hosting process.
///
/// The `LOG` env var overrides the verbosity-derived default. Safe to
/// call more than once; later calls are no-ops.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var("LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .finish()
        .try_init();
}
