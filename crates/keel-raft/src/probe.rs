//! `ConsensusProbe` over a keel Raft node.
//!
//! `leader()` reads the latest published metrics and never blocks.
//! `probe()` commits a `Request::Probe` entry through the log, so it only
//! succeeds if this node can currently reach a quorum as leader.

use keel_health::{ConsensusProbe, MemberId, ProbeError};
use openraft::error::{ClientWriteError, RaftError};
use tracing::debug;

use crate::typ::{KeelRaft, Request};

/// Liveness probe backed by a Raft handle.
///
/// Writes are not forwarded. On a follower `client_write` returns
/// `ForwardToLeader`, which maps to [`ProbeError::NotLeader`], so in a
/// multi-member cluster only the current leader reports healthy until a
/// peer transport that forwards client writes exists.
#[derive(Clone)]
pub struct RaftProbe {
    raft: KeelRaft,
}

impl RaftProbe {
    pub fn new(raft: KeelRaft) -> Self {
        Self { raft }
    }
}

fn probe_error(e: RaftError<u64, ClientWriteError<u64, openraft::BasicNode>>) -> ProbeError {
    match e {
        RaftError::APIError(ClientWriteError::ForwardToLeader(fwd)) => match fwd.leader_id {
            Some(leader) => ProbeError::NotLeader(format!("leader is {leader}")),
            None => ProbeError::NotLeader("leader unknown".to_string()),
        },
        RaftError::APIError(other) => ProbeError::Rejected(other.to_string()),
        RaftError::Fatal(fatal) => ProbeError::Unavailable(fatal.to_string()),
    }
}

impl ConsensusProbe for RaftProbe {
    fn leader(&self) -> Option<MemberId> {
        self.raft.metrics().borrow().current_leader
    }

    async fn probe(&self) -> Result<(), ProbeError> {
        let resp = self
            .raft
            .client_write(Request::Probe)
            .await
            .map_err(probe_error)?;
        debug!(index = resp.log_id.index, "probe committed");
        Ok(())
    }
}
