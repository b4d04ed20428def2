//! Standalone Raft network.
//!
//! A keel node started in standalone mode has no peer transport: every
//! outbound RPC reports the target as unreachable, and openraft treats
//! that like a partitioned peer. A single-voter cluster never sends any.

use openraft::error::{InstallSnapshotError, RPCError, RaftError, Unreachable};
use openraft::network::{RPCOption, RaftNetwork, RaftNetworkFactory};
use openraft::raft::{
    AppendEntriesRequest, AppendEntriesResponse, InstallSnapshotRequest,
    InstallSnapshotResponse, VoteRequest, VoteResponse,
};
use openraft::BasicNode;
use tracing::{debug, warn};

use crate::typ::TypeConfig;

/// Factory handing out [`StandaloneNetwork`] connections.
#[derive(Debug, Clone, Default)]
pub struct StandaloneNetworkFactory;

/// Connection to a peer that cannot be reached.
#[derive(Debug)]
pub struct StandaloneNetwork {
    target: u64,
    addr: String,
}

impl StandaloneNetwork {
    fn unreachable<E: std::error::Error>(&self, rpc: &str) -> RPCError<u64, BasicNode, E> {
        warn!(target_node = self.target, addr = %self.addr, rpc, "raft peer unreachable in standalone mode");
        RPCError::Unreachable(Unreachable::new(&std::io::Error::other(format!(
            "{rpc} to node {} ({}): no peer transport in standalone mode",
            self.target, self.addr,
        ))))
    }
}

impl RaftNetworkFactory<TypeConfig> for StandaloneNetworkFactory {
    type Network = StandaloneNetwork;

    async fn new_client(&mut self, target: u64, node: &BasicNode) -> Self::Network {
        debug!(target, addr = %node.addr, "creating standalone raft connection");
        StandaloneNetwork {
            target,
            addr: node.addr.clone(),
        }
    }
}

impl RaftNetwork<TypeConfig> for StandaloneNetwork {
    async fn append_entries(
        &mut self,
        _rpc: AppendEntriesRequest<TypeConfig>,
        _option: RPCOption,
    ) -> Result<AppendEntriesResponse<u64>, RPCError<u64, BasicNode, RaftError<u64>>> {
        Err(self.unreachable("append_entries"))
    }

    async fn install_snapshot(
        &mut self,
        _rpc: InstallSnapshotRequest<TypeConfig>,
        _option: RPCOption,
    ) -> Result<
        InstallSnapshotResponse<u64>,
        RPCError<u64, BasicNode, RaftError<u64, InstallSnapshotError>>,
    > {
        Err(self.unreachable("install_snapshot"))
    }

    async fn vote(
        &mut self,
        _rpc: VoteRequest<u64>,
        _option: RPCOption,
    ) -> Result<VoteResponse<u64>, RPCError<u64, BasicNode, RaftError<u64>>> {
        Err(self.unreachable("vote"))
    }
}
