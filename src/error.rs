//! Error types for links, nodes and configuration.

use thiserror::Error;

pub use rlnc::CodecError;

use crate::node::Role;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid loss probability (must be in [0, 1]): {0}")]
    InvalidLossProbability(f64),
    #[error("queue capacity must be non-zero")]
    ZeroQueueCapacity,
    #[error("send rate must be non-zero")]
    ZeroRate,
    #[error("invalid duration '{0}': expected e.g. 50ms, 2s, 1m30s")]
    InvalidDuration(String),
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link closed")]
    Closed,
    #[error("link already started")]
    AlreadyStarted,
    #[error("link output already attached to a node")]
    OutputTaken,
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("{operation} is not supported by a {role} node")]
    WrongRole { role: Role, operation: &'static str },
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}
