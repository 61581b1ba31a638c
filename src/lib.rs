/*
    Quorum bookkeeping for an IBFT-style Byzantine agreement: PREPARE,
    COMMIT and ROUND-CHANGE votes are recorded per consensus instance,
    round and sender, and queried for quorums and round-change
    justifications. Transport, authentication, leader election and timers
    are provided by the caller.
*/

pub mod common;
pub mod config;
pub mod consensus;

pub use common::*;
pub use config::QuorumConfig;
pub use consensus::*;
