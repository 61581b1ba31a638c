/*
    Replays a small IBFT instance through the quorum processor: four nodes
    prepare and commit a block in round 0. An optional argument names a
    TOML file with the cluster configuration (`node_count = 4`).
*/

use std::path::PathBuf;
use std::sync::Arc;

use ibft_quorum::{ConsensusMessage, MessageStore, QuorumConfig, QuorumProcessor, Value};
use tokio::sync::mpsc::Sender;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => match QuorumConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                error!(path = %path.display(), %err, "Failed to load config");
                std::process::exit(1);
            }
        },
        None => QuorumConfig::default(),
    };

    let params = match config.params() {
        Ok(params) => params,
        Err(err) => {
            error!(%err, "Invalid cluster configuration");
            std::process::exit(1);
        }
    };
    info!(
        nodes = params.node_count(),
        max_faults = params.max_faults(),
        quorum = params.quorum_size(),
        "Starting replay"
    );

    let store = Arc::new(MessageStore::with_params(params));
    let (msg_tx, msg_rx) = tokio::sync::mpsc::channel(100);
    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel(100);
    let mut processor = QuorumProcessor::new(store, msg_rx, event_tx);
    let handle = tokio::spawn(async move {
        processor.run().await;
    });

    let block = Value::digest(b"genesis");
    let nodes: Vec<String> = (0..params.node_count()).map(|i| format!("node-{}", i)).collect();
    let messages = nodes
        .iter()
        .map(|node| ConsensusMessage::prepare(node.as_str(), 0, 0, block.clone()))
        .chain(
            nodes
                .iter()
                .map(|node| ConsensusMessage::commit(node.as_str(), 0, 0, block.clone())),
        );
    let sent = replay(&msg_tx, messages).await;
    info!(sent, "Replayed messages");
    drop(msg_tx);

    while let Some(event) = event_rx.recv().await {
        info!(?event, "Received event");
    }

    if let Err(err) = handle.await {
        error!(%err, "Quorum processor task failed");
        std::process::exit(1);
    }
}

/// Sends `messages` in order and stops at the first one the processor
/// can no longer accept. Returns how many were delivered.
async fn replay(
    msg_tx: &Sender<ConsensusMessage>,
    messages: impl IntoIterator<Item = ConsensusMessage>,
) -> usize {
    let mut sent = 0;
    for message in messages {
        if let Err(err) = msg_tx.send(message).await {
            error!(%err, sent, "Quorum processor stopped, aborting replay");
            break;
        }
        sent += 1;
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replay_delivers_all_messages() {
        let (msg_tx, mut msg_rx) = tokio::sync::mpsc::channel(10);
        let messages =
            (0..3).map(|i| ConsensusMessage::prepare(format!("n{}", i).as_str(), 0, 0, "a"));

        assert_eq!(replay(&msg_tx, messages).await, 3);
        for _ in 0..3 {
            assert!(msg_rx.recv().await.is_some());
        }
    }

    #[tokio::test]
    async fn test_replay_stops_when_processor_is_gone() {
        let (msg_tx, msg_rx) = tokio::sync::mpsc::channel(10);
        drop(msg_rx);
        let messages =
            (0..3).map(|i| ConsensusMessage::commit(format!("n{}", i).as_str(), 0, 0, "a"));

        assert_eq!(replay(&msg_tx, messages).await, 0);
    }
}
