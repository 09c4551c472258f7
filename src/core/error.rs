//! Core capability errors (parsing, validation, structural invariants).
//!
//! These are bounded and stable: core errors represent domain/refusal
//! states, not library implementation details.

use thiserror::Error;

use crate::error::{Effect, Transience};

/// Invalid identifier.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum InvalidId {
    #[error("actor id `{raw}` is invalid: {reason}")]
    Actor { raw: String, reason: String },
    #[error("workspace id `{raw}` is invalid: {reason}")]
    Workspace { raw: String, reason: String },
    #[error("entity id `{raw}` is invalid: {reason}")]
    Entity { raw: String, reason: String },
    #[error("container id `{raw}` is invalid: {reason}")]
    Container { raw: String, reason: String },
    #[error("port id `{raw}` is invalid: {reason}")]
    Port { raw: String, reason: String },
    #[error("edge id `{raw}` is invalid: {reason}")]
    Edge { raw: String, reason: String },
    #[error("reference id `{raw}` is invalid: {reason}")]
    Reference { raw: String, reason: String },
    #[error("plan id `{raw}` is invalid: {reason}")]
    Plan { raw: String, reason: String },
}

/// Unparseable enum-ish value.
#[derive(Debug, Error, Clone)]
#[error("{field} value `{raw}` is invalid")]
pub struct InvalidValue {
    pub field: &'static str,
    pub raw: String,
}

/// A container must keep at least one of title/body non-empty.
#[derive(Debug, Error, Clone)]
#[error("container {container} would have neither title nor body")]
pub struct ContentInvariant {
    pub container: String,
}

/// Edge metadata key that smells like content is rejected outright.
#[derive(Debug, Error, Clone)]
#[error("edge metadata key `{key}` looks like a content field")]
pub struct ContentKeyRejected {
    pub key: String,
}

/// A reference with links must mark exactly one primary.
#[derive(Debug, Error, Clone)]
#[error("reference for container {container} has {primaries} primary links (want 1)")]
pub struct PrimaryLinkInvariant {
    pub container: String,
    pub primaries: usize,
}

/// An edge must connect two distinct ports.
#[derive(Debug, Error, Clone)]
#[error("edge endpoints are invalid: {reason}")]
pub struct InvalidEndpoints {
    pub reason: String,
}

/// Canonical error enum for core capability.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
    #[error(transparent)]
    InvalidValue(#[from] InvalidValue),
    #[error(transparent)]
    ContentInvariant(#[from] ContentInvariant),
    #[error(transparent)]
    ContentKeyRejected(#[from] ContentKeyRejected),
    #[error(transparent)]
    PrimaryLinkInvariant(#[from] PrimaryLinkInvariant),
    #[error(transparent)]
    InvalidEndpoints(#[from] InvalidEndpoints),
}

impl CoreError {
    pub fn transience(&self) -> Transience {
        // Core errors are pure domain/input failures.
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}
