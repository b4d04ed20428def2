//! Consensus liveness contract consumed by the health checker.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::alarm::MemberId;

/// Why a liveness probe did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("not leader: {0}")]
    NotLeader(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("probe unavailable: {0}")]
    Unavailable(String),
}

/// The consensus layer as seen by the health checker.
pub trait ConsensusProbe: Send + Sync + 'static {
    /// Currently perceived leader, from local (possibly stale) state.
    /// Must not block.
    fn leader(&self) -> Option<MemberId>;

    /// Submit a no-op request through the replicated log and wait for it
    /// to commit. Must not change stored data.
    ///
    /// The caller bounds this with its own deadline.
    fn probe(&self) -> impl Future<Output = Result<(), ProbeError>> + Send;
}
