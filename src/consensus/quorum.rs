use crate::common::error::{QuorumError, Result};

/*
    With n replicas of which at most f = (n - 1) / 3 are Byzantine, a
    quorum of floor((n + f) / 2) + 1 votes guarantees that any two quorums
    share at least one correct replica: two quorums together hold more
    than n + f votes, so they overlap in more than f replicas.

    f + 1 votes (a weak quorum) guarantee at least one correct voter.
*/

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct QuorumParams {
    n: usize,
    f: usize,
    quorum_size: usize,
}

impl QuorumParams {
    pub fn new(n: usize) -> Result<Self> {
        if n < 1 {
            return Err(QuorumError::InvalidClusterSize { n });
        }

        let f = (n - 1) / 3;
        let quorum_size = (n + f) / 2 + 1;

        Ok(QuorumParams { n, f, quorum_size })
    }

    pub fn node_count(&self) -> usize {
        self.n
    }

    pub fn max_faults(&self) -> usize {
        self.f
    }

    pub fn quorum_size(&self) -> usize {
        self.quorum_size
    }

    /// Smallest set guaranteed to contain a correct node.
    pub fn weak_quorum_size(&self) -> usize {
        self.f + 1
    }

    pub fn is_quorum(&self, votes: usize) -> bool {
        votes >= self.quorum_size
    }

    pub fn is_weak_quorum(&self, votes: usize) -> bool {
        votes >= self.weak_quorum_size()
    }
}
