//! Raft node construction and single-node bootstrap.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use openraft::error::{InitializeError, RaftError};
use openraft::{BasicNode, Config};
use redb::Database;
use tracing::info;

use crate::error::RaftNodeError;
use crate::log_store::LogStore;
use crate::network::StandaloneNetworkFactory;
use crate::state_machine::StateMachine;
use crate::typ::KeelRaft;

/// Raft timing for a keel node.
pub fn raft_config() -> Result<Arc<Config>, RaftNodeError> {
    let config = Config {
        cluster_name: "keel".to_string(),
        heartbeat_interval: 250,
        election_timeout_min: 1000,
        election_timeout_max: 2000,
        ..Default::default()
    }
    .validate()?;
    Ok(Arc::new(config))
}

/// Build a Raft node whose log and state machine share `db`.
///
/// The node starts uninitialized: it has no membership and no leader
/// until [`bootstrap_single`] runs or a restart recovers stored state.
pub async fn start_node(
    node_id: u64,
    db: Arc<Database>,
    config: Arc<Config>,
) -> Result<KeelRaft, RaftNodeError> {
    let log_store = LogStore::open(Arc::clone(&db))?;
    let state_machine = StateMachine::open(db)?;

    let raft = KeelRaft::new(
        node_id,
        config,
        StandaloneNetworkFactory,
        log_store,
        state_machine,
    )
    .await?;

    info!(node_id, "raft node started");
    Ok(raft)
}

/// Make `node_id` the sole voter and wait until it leads.
///
/// Restarting on existing state is not an error: the stored membership
/// is kept and only the leader wait applies.
pub async fn bootstrap_single(
    raft: &KeelRaft,
    node_id: u64,
    addr: &str,
    wait: Duration,
) -> Result<(), RaftNodeError> {
    let members = BTreeMap::from([(node_id, BasicNode::new(addr))]);

    match raft.initialize(members).await {
        Ok(()) => info!(node_id, %addr, "initialized single-node cluster"),
        Err(RaftError::APIError(InitializeError::NotAllowed(_))) => {
            info!(node_id, "cluster already initialized; recovering stored membership")
        }
        Err(e) => return Err(RaftNodeError::Initialize(e.to_string())),
    }

    raft.wait(Some(wait))
        .current_leader(node_id, "single-node leader election")
        .await
        .map_err(|e| RaftNodeError::NoLeader(e.to_string()))?;

    info!(node_id, "node is leader");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::backends::InMemoryBackend;

    fn test_db() -> Arc<Database> {
        let backend = InMemoryBackend::new();
        Arc::new(Database::builder().create_with_backend(backend).unwrap())
    }

    #[test]
    fn config_is_valid() {
        let config = raft_config().unwrap();
        assert_eq!(config.cluster_name, "keel");
        assert!(config.election_timeout_min > config.heartbeat_interval);
    }

    #[tokio::test]
    async fn fresh_node_has_no_leader() {
        let raft = start_node(1, test_db(), raft_config().unwrap()).await.unwrap();
        assert_eq!(raft.metrics().borrow().current_leader, None);
        raft.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn bootstrap_elects_self() {
        let raft = start_node(1, test_db(), raft_config().unwrap()).await.unwrap();
        bootstrap_single(&raft, 1, "127.0.0.1:2380", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(raft.metrics().borrow().current_leader, Some(1));

        // A second bootstrap on the same node is tolerated.
        bootstrap_single(&raft, 1, "127.0.0.1:2380", Duration::from_secs(10))
            .await
            .unwrap();
        raft.shutdown().await.unwrap();
    }
}
