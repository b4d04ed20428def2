//! Raft type configuration for keel.

use std::io::Cursor;

use openraft::TokioRuntime;

/// Client write request submitted to the Raft cluster.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Request {
    /// Liveness probe. Committed like any write, applied as a no-op.
    Probe,
}

/// Acknowledgement returned once a request is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Response;

openraft::declare_raft_types!(
    /// keel Raft type configuration.
    pub TypeConfig:
        D = Request,
        R = Response,
        NodeId = u64,
        Node = openraft::BasicNode,
        Entry = openraft::Entry<TypeConfig>,
        SnapshotData = Cursor<Vec<u8>>,
        AsyncRuntime = TokioRuntime,
);

/// Convenience alias for the Raft instance.
pub type KeelRaft = openraft::Raft<TypeConfig>;
