use thiserror::Error;

use crate::common::value::Value;
use crate::consensus::message::{Instance, Phase, Round};

pub type Result<T> = std::result::Result<T, QuorumError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuorumError {
    /// Cluster size must be at least one.
    #[error("invalid cluster size {n}: at least one node is required")]
    InvalidClusterSize { n: usize },

    /// Two distinct values reached quorum for the same key. Quorums of this
    /// size intersect in a correct node, so this is a safety breach.
    #[error("conflicting {phase:?} quorums at {instance}/{round}: {first} and {second}")]
    ConflictingQuorum {
        instance: Instance,
        round: Round,
        phase: Phase,
        first: Value,
        second: Value,
    },

    /// Two ROUND-CHANGE messages report the same highest prepared round
    /// with different values.
    #[error("justification conflict at {instance}/{round}, pr {prepared_round}: {first}, {second}")]
    ConflictingJustification {
        instance: Instance,
        round: Round,
        prepared_round: Round,
        first: Value,
        second: Value,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Quorum(#[from] QuorumError),
}
