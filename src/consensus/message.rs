use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::value::Value;

/*
    Every vote is stamped with the consensus instance it belongs to and
    the round the sender is currently in. PREPARE and COMMIT carry the
    value the sender is voting for. ROUND-CHANGE carries the sender's
    prepared certificate summary (pr, pv): the highest round in which it
    saw a PREPARE quorum and the value of that quorum, or nothing if it
    never prepared in this instance.

    Messages arrive here already authenticated and decoded.
*/

pub type Instance = u64;
pub type Round = u64;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Phase {
    Prepare,
    Commit,
    RoundChange,
}

/// The (pr, pv) pair a node carries into a round change.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Prepared {
    pub round: Round,
    pub value: Value,
}

impl Prepared {
    pub fn new(round: Round, value: impl Into<Value>) -> Self {
        Prepared {
            round,
            value: value.into(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum MessageKind {
    Prepare { value: Value },
    Commit { value: Value },
    RoundChange { prepared: Option<Prepared> },
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ConsensusMessage {
    pub sender: NodeId,
    pub instance: Instance,
    pub round: Round,
    pub kind: MessageKind,
}

impl ConsensusMessage {
    pub fn prepare(
        sender: impl Into<NodeId>,
        instance: Instance,
        round: Round,
        value: impl Into<Value>,
    ) -> Self {
        ConsensusMessage {
            sender: sender.into(),
            instance,
            round,
            kind: MessageKind::Prepare { value: value.into() },
        }
    }

    pub fn commit(
        sender: impl Into<NodeId>,
        instance: Instance,
        round: Round,
        value: impl Into<Value>,
    ) -> Self {
        ConsensusMessage {
            sender: sender.into(),
            instance,
            round,
            kind: MessageKind::Commit { value: value.into() },
        }
    }

    pub fn round_change(
        sender: impl Into<NodeId>,
        instance: Instance,
        round: Round,
        prepared: Option<Prepared>,
    ) -> Self {
        ConsensusMessage {
            sender: sender.into(),
            instance,
            round,
            kind: MessageKind::RoundChange { prepared },
        }
    }

    pub fn phase(&self) -> Phase {
        match self.kind {
            MessageKind::Prepare { .. } => Phase::Prepare,
            MessageKind::Commit { .. } => Phase::Commit,
            MessageKind::RoundChange { .. } => Phase::RoundChange,
        }
    }

    /// Proposed value of a PREPARE or COMMIT.
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            MessageKind::Prepare { value } | MessageKind::Commit { value } => Some(value),
            MessageKind::RoundChange { .. } => None,
        }
    }

    /// Prepared justification of a ROUND-CHANGE, if it carries one.
    pub fn prepared(&self) -> Option<&Prepared> {
        match &self.kind {
            MessageKind::RoundChange { prepared } => prepared.as_ref(),
            _ => None,
        }
    }
}
