use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::common::error::Result;
use super::message::{ConsensusMessage, Instance, NodeId, Phase, Round};
use super::quorum::QuorumParams;

/*
    Concurrency contract

    `record` may be called from any number of threads at once. Each level
    of the instance -> round -> sender map is its own concurrent map and
    intermediate levels are created with an atomic insert-if-absent, so
    inserts into unrelated instances or rounds never contend on one lock.

    Reads are not point-in-time snapshots: a query running concurrently
    with `record` may or may not observe the new message. Callers re-run
    the relevant predicate after every insertion instead of waiting to be
    notified. A predicate that misses a message will see it on the next
    poll.
*/

type SenderMap = DashMap<NodeId, ConsensusMessage>;
type RoundMap = DashMap<Round, Arc<SenderMap>>;

/// Latest message per (instance, round, sender) for a single phase.
#[derive(Default)]
pub struct MessageBucket {
    messages: DashMap<Instance, Arc<RoundMap>>,
}

impl MessageBucket {
    pub fn new() -> Self {
        MessageBucket {
            messages: DashMap::new(),
        }
    }

    /// Stores `message`, replacing any earlier message from the same sender
    /// for the same instance and round. Returns the replaced message.
    pub fn add_message(&self, message: ConsensusMessage) -> Option<ConsensusMessage> {
        let rounds = Arc::clone(&*self.messages.entry(message.instance).or_default());
        let senders = Arc::clone(&*rounds.entry(message.round).or_default());
        senders.insert(message.sender.clone(), message)
    }

    /// Snapshot of sender -> message, or `None` if nothing was ever
    /// recorded for this instance and round.
    pub fn messages(
        &self,
        instance: Instance,
        round: Round,
    ) -> Option<HashMap<NodeId, ConsensusMessage>> {
        let senders = self.senders(instance, round)?;
        let snapshot: HashMap<NodeId, ConsensusMessage> = senders
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        if snapshot.is_empty() {
            return None;
        }
        Some(snapshot)
    }

    /// Number of distinct senders recorded for this instance and round.
    pub fn sender_count(&self, instance: Instance, round: Round) -> usize {
        self.senders(instance, round).map_or(0, |senders| senders.len())
    }

    /// Rounds of `instance` holding at least one message, ascending.
    pub fn rounds(&self, instance: Instance) -> Vec<Round> {
        let Some(rounds) = self
            .messages
            .get(&instance)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return Vec::new();
        };

        let mut result: Vec<Round> = rounds
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| *entry.key())
            .collect();
        result.sort_unstable();
        result
    }

    pub fn instances(&self) -> Vec<Instance> {
        let mut result: Vec<Instance> = self.messages.iter().map(|entry| *entry.key()).collect();
        result.sort_unstable();
        result
    }

    fn senders(&self, instance: Instance, round: Round) -> Option<Arc<SenderMap>> {
        let rounds = Arc::clone(self.messages.get(&instance)?.value());
        let senders = Arc::clone(rounds.get(&round)?.value());
        Some(senders)
    }
}

/// Vote store for one participant: a bucket per phase, so a sender's
/// PREPARE, COMMIT and ROUND-CHANGE for the same round never replace
/// each other.
pub struct MessageStore {
    params: QuorumParams,
    prepares: MessageBucket,
    commits: MessageBucket,
    round_changes: MessageBucket,
}

impl MessageStore {
    pub fn new(node_count: usize) -> Result<Self> {
        Ok(MessageStore::with_params(QuorumParams::new(node_count)?))
    }

    pub fn with_params(params: QuorumParams) -> Self {
        MessageStore {
            params,
            prepares: MessageBucket::new(),
            commits: MessageBucket::new(),
            round_changes: MessageBucket::new(),
        }
    }

    pub fn params(&self) -> &QuorumParams {
        &self.params
    }

    /// Records `message` under its (instance, round, sender) key. Never
    /// fails; re-recording an identical message leaves the store unchanged.
    pub fn record(&self, message: ConsensusMessage) {
        let phase = message.phase();
        let instance = message.instance;
        let round = message.round;
        let sender = message.sender.clone();

        let replaced = self.bucket(phase).add_message(message);
        debug!(
            ?phase,
            instance,
            round,
            sender = %sender,
            overwrite = replaced.is_some(),
            "Recorded message"
        );
    }

    pub fn messages_for(
        &self,
        phase: Phase,
        instance: Instance,
        round: Round,
    ) -> Option<HashMap<NodeId, ConsensusMessage>> {
        self.bucket(phase).messages(instance, round)
    }

    pub fn instances(&self) -> Vec<Instance> {
        let mut result: Vec<Instance> = [Phase::Prepare, Phase::Commit, Phase::RoundChange]
            .into_iter()
            .flat_map(|phase| self.bucket(phase).instances())
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    pub fn rounds(&self, phase: Phase, instance: Instance) -> Vec<Round> {
        self.bucket(phase).rounds(instance)
    }

    pub(crate) fn bucket(&self, phase: Phase) -> &MessageBucket {
        match phase {
            Phase::Prepare => &self.prepares,
            Phase::Commit => &self.commits,
            Phase::RoundChange => &self.round_changes,
        }
    }
}
