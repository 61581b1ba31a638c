use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{error, info, warn};

use crate::common::error::QuorumError;
use crate::common::value::Value;
use super::message::{ConsensusMessage, Instance, Phase, Prepared, Round};
use super::store::MessageStore;

/*
    Records every inbound message and then re-checks only the predicate
    for that message's phase. Each (phase, instance, round) produces at
    most one event. Leader election, timers and proposals belong to the
    caller, which reacts to the events.
*/

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum QuorumEvent {
    PrepareQuorum {
        instance: Instance,
        round: Round,
        value: Value,
    },
    CommitQuorum {
        instance: Instance,
        round: Round,
        value: Value,
    },
    RoundChangeQuorum {
        instance: Instance,
        round: Round,
        justification: Option<Prepared>,
    },
    Violation(QuorumError),
}

pub struct QuorumProcessor {
    pub store: Arc<MessageStore>,
    pub msg_rx: Receiver<ConsensusMessage>,
    pub event_tx: Sender<QuorumEvent>,
    emitted: HashSet<(Phase, Instance, Round)>,
}

impl QuorumProcessor {
    pub fn new(
        store: Arc<MessageStore>,
        msg_rx: Receiver<ConsensusMessage>,
        event_tx: Sender<QuorumEvent>,
    ) -> Self {
        QuorumProcessor {
            store,
            msg_rx,
            event_tx,
            emitted: HashSet::new(),
        }
    }

    pub async fn run(&mut self) {
        info!(quorum = self.store.params().quorum_size(), "Running quorum processor");
        while let Some(message) = self.msg_rx.recv().await {
            let Some(event) = self.handle_message(message) else {
                continue;
            };

            if self.event_tx.send(event).await.is_err() {
                warn!("Event receiver dropped, stopping quorum processor");
                return;
            }
        }
        info!("Message channel closed, stopping quorum processor");
    }

    pub fn handle_message(&mut self, message: ConsensusMessage) -> Option<QuorumEvent> {
        let key = (message.phase(), message.instance, message.round);
        self.store.record(message);

        if self.emitted.contains(&key) {
            return None;
        }

        let event = self.evaluate(key.0, key.1, key.2)?;
        match &event {
            QuorumEvent::Violation(err) => error!(%err, "Quorum invariant violated"),
            event => info!(?event, "Quorum event"),
        }
        self.emitted.insert(key);
        Some(event)
    }

    fn evaluate(&self, phase: Phase, instance: Instance, round: Round) -> Option<QuorumEvent> {
        let result = match phase {
            Phase::Prepare => self.store.prepare_quorum_value(instance, round).map(|value| {
                value.map(|value| QuorumEvent::PrepareQuorum {
                    instance,
                    round,
                    value,
                })
            }),
            Phase::Commit => self.store.commit_quorum_value(instance, round).map(|value| {
                value.map(|value| QuorumEvent::CommitQuorum {
                    instance,
                    round,
                    value,
                })
            }),
            Phase::RoundChange => {
                if !self.store.round_change_quorum_reached(instance, round) {
                    return None;
                }
                self.store
                    .highest_prepared_justification(instance, round)
                    .map(|justification| {
                        Some(QuorumEvent::RoundChangeQuorum {
                            instance,
                            round,
                            justification,
                        })
                    })
            }
        };

        result.unwrap_or_else(|err| Some(QuorumEvent::Violation(err)))
    }
}
