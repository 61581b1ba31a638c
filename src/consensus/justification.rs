use tracing::{debug, error, info};

use crate::common::error::{QuorumError, Result};
use super::message::{Instance, Phase, Prepared, Round};
use super::store::MessageStore;

/*
    Round-change justification

    When a quorum of ROUND-CHANGE messages for round r is collected, the
    new leader must either re-propose the value of the highest prepared
    certificate carried in those messages, or show that none of them
    carries one, in which case any value may be proposed.

    A node that sees f + 1 ROUND-CHANGE messages for a round ahead of its
    own knows at least one correct node is already there and can skip
    ahead to the lowest round any peer has asked for.
*/

impl MessageStore {
    /// The (pr, pv) with the highest prepared round among the ROUND-CHANGE
    /// messages for (instance, round).
    pub fn highest_prepared_justification(
        &self,
        instance: Instance,
        round: Round,
    ) -> Result<Option<Prepared>> {
        let Some(messages) = self.messages_for(Phase::RoundChange, instance, round) else {
            return Ok(None);
        };

        let Some(highest_round) = messages
            .values()
            .filter_map(|message| message.prepared())
            .map(|prepared| prepared.round)
            .max()
        else {
            return Ok(None);
        };

        let mut values = messages
            .values()
            .filter_map(|message| message.prepared())
            .filter(|prepared| prepared.round == highest_round)
            .map(|prepared| &prepared.value)
            .collect::<Vec<_>>();
        values.sort();
        values.dedup();

        if let [first, second, ..] = values.as_slice() {
            error!(
                instance,
                round,
                prepared_round = highest_round,
                %first,
                %second,
                "Conflicting justifications detected"
            );
            return Err(QuorumError::ConflictingJustification {
                instance,
                round,
                prepared_round: highest_round,
                first: (*first).clone(),
                second: (*second).clone(),
            });
        }

        let justification = values
            .first()
            .map(|value| Prepared::new(highest_round, (*value).clone()));
        debug!(instance, round, ?justification, "Highest prepared justification");
        Ok(justification)
    }

    /// True iff ROUND-CHANGE messages exist for (instance, round) and none
    /// of them carries a prepared round or value.
    pub fn all_round_changes_unprepared(&self, instance: Instance, round: Round) -> bool {
        let Some(messages) = self.messages_for(Phase::RoundChange, instance, round) else {
            return false;
        };

        messages.values().all(|message| message.prepared().is_none())
    }

    /// Lowest round in `(current_round, candidate_round]` with a recorded
    /// ROUND-CHANGE, provided `candidate_round` is ahead of `current_round`
    /// and has ROUND-CHANGE messages from at least f + 1 distinct senders.
    /// `None` means no fast-forward.
    pub fn minimum_attested_round(
        &self,
        instance: Instance,
        current_round: Round,
        candidate_round: Round,
    ) -> Option<Round> {
        if candidate_round <= current_round {
            return None;
        }

        let bucket = self.bucket(Phase::RoundChange);
        let senders = bucket.sender_count(instance, candidate_round);
        if !self.params().is_weak_quorum(senders) {
            return None;
        }

        let target = bucket
            .rounds(instance)
            .into_iter()
            .find(|round| *round > current_round && *round <= candidate_round)
            .unwrap_or(candidate_round);

        info!(instance, current_round, candidate_round, target, "Fast-forwarding round");
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::value::Value;
    use crate::consensus::message::ConsensusMessage;

    fn store() -> MessageStore {
        MessageStore::new(4).unwrap()
    }

    #[test]
    fn test_highest_prepared_picks_max_round() {
        let store = store();
        store.record(ConsensusMessage::round_change("n1", 0, 6, Some(Prepared::new(2, "a"))));
        store.record(ConsensusMessage::round_change("n2", 0, 6, Some(Prepared::new(5, "b"))));
        store.record(ConsensusMessage::round_change("n3", 0, 6, Some(Prepared::new(3, "c"))));
        store.record(ConsensusMessage::round_change("n4", 0, 6, None));

        assert_eq!(store.highest_prepared_justification(0, 6), Ok(Some(Prepared::new(5, "b"))));
    }

    #[test]
    fn test_highest_prepared_absent() {
        let store = store();
        assert_eq!(store.highest_prepared_justification(0, 1), Ok(None));

        store.record(ConsensusMessage::round_change("n1", 0, 1, None));
        store.record(ConsensusMessage::round_change("n2", 0, 1, None));
        assert_eq!(store.highest_prepared_justification(0, 1), Ok(None));
    }

    #[test]
    fn test_highest_prepared_agreeing_ties() {
        let store = store();
        store.record(ConsensusMessage::round_change("n1", 0, 4, Some(Prepared::new(3, "a"))));
        store.record(ConsensusMessage::round_change("n2", 0, 4, Some(Prepared::new(3, "a"))));

        assert_eq!(store.highest_prepared_justification(0, 4), Ok(Some(Prepared::new(3, "a"))));
    }

    #[test]
    fn test_highest_prepared_conflict() {
        let store = store();
        store.record(ConsensusMessage::round_change("n1", 0, 4, Some(Prepared::new(3, "b"))));
        store.record(ConsensusMessage::round_change("n2", 0, 4, Some(Prepared::new(3, "a"))));
        store.record(ConsensusMessage::round_change("n3", 0, 4, Some(Prepared::new(1, "c"))));

        assert_eq!(
            store.highest_prepared_justification(0, 4),
            Err(QuorumError::ConflictingJustification {
                instance: 0,
                round: 4,
                prepared_round: 3,
                first: Value::from("a"),
                second: Value::from("b"),
            })
        );
    }

    #[test]
    fn test_conflict_below_max_is_ignored() {
        let store = store();
        store.record(ConsensusMessage::round_change("n1", 0, 7, Some(Prepared::new(2, "a"))));
        store.record(ConsensusMessage::round_change("n2", 0, 7, Some(Prepared::new(2, "b"))));
        store.record(ConsensusMessage::round_change("n3", 0, 7, Some(Prepared::new(6, "c"))));

        assert_eq!(store.highest_prepared_justification(0, 7), Ok(Some(Prepared::new(6, "c"))));
    }

    #[test]
    fn test_all_round_changes_unprepared() {
        let store = store();
        assert!(!store.all_round_changes_unprepared(0, 3));

        store.record(ConsensusMessage::round_change("n1", 0, 3, None));
        store.record(ConsensusMessage::round_change("n2", 0, 3, None));
        assert!(store.all_round_changes_unprepared(0, 3));

        store.record(ConsensusMessage::round_change("n3", 0, 3, Some(Prepared::new(1, "a"))));
        assert!(!store.all_round_changes_unprepared(0, 3));

        // Preparations in other phases do not matter
        store.record(ConsensusMessage::prepare("n1", 0, 4, "a"));
        store.record(ConsensusMessage::round_change("n1", 0, 4, None));
        assert!(store.all_round_changes_unprepared(0, 4));
    }

    #[test]
    fn test_fast_forward_to_earliest_attested_round() {
        // n = 4, f = 1: two senders at round 5 meet f + 1
        let store = store();
        store.record(ConsensusMessage::round_change("n3", 0, 4, None));
        store.record(ConsensusMessage::round_change("n1", 0, 5, None));
        store.record(ConsensusMessage::round_change("n2", 0, 5, None));

        assert_eq!(store.minimum_attested_round(0, 2, 5), Some(4));
    }

    #[test]
    fn test_fast_forward_to_candidate() {
        let store = store();
        store.record(ConsensusMessage::round_change("n1", 0, 1, None));
        store.record(ConsensusMessage::round_change("n1", 0, 5, None));
        store.record(ConsensusMessage::round_change("n2", 0, 5, None));

        assert_eq!(store.minimum_attested_round(0, 2, 5), Some(5));
    }

    #[test]
    fn test_no_fast_forward() {
        let store = store();
        store.record(ConsensusMessage::round_change("n1", 0, 5, None));
        // Below f + 1
        assert_eq!(store.minimum_attested_round(0, 2, 5), None);

        store.record(ConsensusMessage::round_change("n2", 0, 5, None));
        // Not ahead of the current round
        assert_eq!(store.minimum_attested_round(0, 5, 5), None);
        assert_eq!(store.minimum_attested_round(0, 7, 5), None);
        // Unseen instance or round
        assert_eq!(store.minimum_attested_round(1, 2, 5), None);
        assert_eq!(store.minimum_attested_round(0, 2, 6), None);
    }

    #[test]
    fn test_fast_forward_single_node_cluster() {
        let store = MessageStore::new(1).unwrap();
        store.record(ConsensusMessage::round_change("n1", 0, 3, None));
        assert_eq!(store.minimum_attested_round(0, 0, 3), Some(3));
    }

    #[test]
    fn test_unseen_key_is_absent() {
        let store = store();
        assert_eq!(store.highest_prepared_justification(9, 9), Ok(None));
        assert!(!store.all_round_changes_unprepared(9, 9));
        assert_eq!(store.minimum_attested_round(9, 0, 9), None);
    }
}
