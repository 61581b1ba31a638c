use std::collections::{HashMap, HashSet};

use tracing::{debug, error};

use crate::common::error::{QuorumError, Result};
use crate::common::value::Value;
use super::message::{ConsensusMessage, Instance, Phase, Round};
use super::quorum::QuorumParams;
use super::store::MessageStore;

/*
    A quorum certificate for (phase, instance, round, value) is the set of
    votes from at least quorum_size distinct senders that all carry the
    same value. Because any two quorums intersect in a correct node, at
    most one value can be certified per key; finding two is reported as
    ConflictingQuorum and never resolved here.
*/

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QuorumCertificate {
    pub phase: Phase,
    pub instance: Instance,
    pub round: Round,
    pub value: Value,
    pub messages: Vec<ConsensusMessage>,
}

impl QuorumCertificate {
    pub fn is_complete(&self, params: &QuorumParams) -> bool {
        params.is_quorum(self.messages.len())
    }

    /// Checks that every vote matches the certified key and value and that
    /// enough distinct senders signed off on it.
    pub fn validate(&self, params: &QuorumParams) -> bool {
        let mut senders = HashSet::new();
        for message in &self.messages {
            if message.phase() != self.phase
                || message.instance != self.instance
                || message.round != self.round
            {
                debug!(sender = %message.sender, "QC failed: vote for a different key");
                return false;
            }

            if message.value() != Some(&self.value) {
                debug!(sender = %message.sender, "QC failed: vote for a different value");
                return false;
            }

            senders.insert(&message.sender);
        }

        if !params.is_quorum(senders.len()) {
            debug!(
                senders = senders.len(),
                quorum = params.quorum_size(),
                "QC failed: not enough distinct senders"
            );
            return false;
        }

        true
    }
}

impl MessageStore {
    /// Value backed by a PREPARE quorum at (instance, round), if any.
    pub fn prepare_quorum_value(&self, instance: Instance, round: Round) -> Result<Option<Value>> {
        Ok(self.prepare_certificate(instance, round)?.map(|qc| qc.value))
    }

    /// Value backed by a COMMIT quorum at (instance, round), if any.
    pub fn commit_quorum_value(&self, instance: Instance, round: Round) -> Result<Option<Value>> {
        Ok(self.commit_certificate(instance, round)?.map(|qc| qc.value))
    }

    pub fn prepare_certificate(
        &self,
        instance: Instance,
        round: Round,
    ) -> Result<Option<QuorumCertificate>> {
        self.certificate(Phase::Prepare, instance, round)
    }

    pub fn commit_certificate(
        &self,
        instance: Instance,
        round: Round,
    ) -> Result<Option<QuorumCertificate>> {
        self.certificate(Phase::Commit, instance, round)
    }

    /// True once ROUND-CHANGE messages from a quorum of distinct senders
    /// were recorded for (instance, round). Their justifications may differ.
    pub fn round_change_quorum_reached(&self, instance: Instance, round: Round) -> bool {
        let senders = self.bucket(Phase::RoundChange).sender_count(instance, round);
        self.params().is_quorum(senders)
    }

    /// True iff at least one PREPARE is recorded for (instance, round) and
    /// every one of them is for `reference_round` and `reference_value`.
    pub fn all_prepared_consistent(
        &self,
        instance: Instance,
        round: Round,
        reference_round: Round,
        reference_value: &Value,
    ) -> bool {
        let Some(messages) = self.messages_for(Phase::Prepare, instance, round) else {
            return false;
        };

        messages.values().all(|message| {
            message.round == reference_round && message.value() == Some(reference_value)
        })
    }

    fn certificate(
        &self,
        phase: Phase,
        instance: Instance,
        round: Round,
    ) -> Result<Option<QuorumCertificate>> {
        let Some(messages) = self.messages_for(phase, instance, round) else {
            return Ok(None);
        };

        let mut votes: HashMap<Value, Vec<ConsensusMessage>> = HashMap::new();
        for message in messages.into_values() {
            let Some(value) = message.value().cloned() else {
                continue;
            };
            votes.entry(value).or_default().push(message);
        }

        let mut reached: Vec<(Value, Vec<ConsensusMessage>)> = votes
            .into_iter()
            .filter(|(_, messages)| self.params().is_quorum(messages.len()))
            .collect();
        reached.sort_by(|a, b| a.0.cmp(&b.0));

        if reached.len() > 1 {
            let first = reached[0].0.clone();
            let second = reached[1].0.clone();
            error!(?phase, instance, round, %first, %second, "Conflicting quorums detected");
            return Err(QuorumError::ConflictingQuorum {
                instance,
                round,
                phase,
                first,
                second,
            });
        }

        let Some((value, mut messages)) = reached.pop() else {
            return Ok(None);
        };
        messages.sort_by(|a, b| a.sender.cmp(&b.sender));

        debug!(?phase, instance, round, %value, votes = messages.len(), "Quorum reached");
        Ok(Some(QuorumCertificate {
            phase,
            instance,
            round,
            value,
            messages,
        }))
    }
}
