// openraft's StorageError is large; allow returning it by value.
#![allow(clippy::result_large_err)]

//! keel Raft consensus: openraft over redb storage.
//!
//! The consensus layer the health checker probes. A `Request::Probe`
//! entry is committed through the Raft log and applied as a no-op, so a
//! successful write proves this node can still reach a quorum.
//!
//! # Architecture
//!
//! - **`typ`**: Type configuration (`TypeConfig`, `Request`, `Response`)
//! - **`log_store`**: Raft log storage backed by redb
//! - **`state_machine`**: Applied index and membership, with snapshots
//! - **`network`**: Standalone transport (no reachable peers)
//! - **`node`**: Raft instance construction and single-node bootstrap
//! - **`probe`**: `ConsensusProbe` implementation over the Raft handle

pub mod error;
pub mod log_store;
pub mod network;
pub mod node;
pub mod probe;
pub mod state_machine;
pub mod typ;

pub use error::RaftNodeError;
pub use log_store::LogStore;
pub use network::{StandaloneNetwork, StandaloneNetworkFactory};
pub use node::{bootstrap_single, raft_config, start_node};
pub use probe::RaftProbe;
pub use state_machine::StateMachine;
pub use typ::{KeelRaft, Request, Response, TypeConfig};
