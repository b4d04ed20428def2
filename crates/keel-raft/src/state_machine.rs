//! Raft state machine backed by redb.
//!
//! The only replicated request is `Request::Probe`, so the applied state
//! is the last applied log id plus the stored membership. Both live in
//! the `keel_sm_meta` table and are written in the same transaction as
//! the entry they describe.

use std::io::Cursor;
use std::sync::Arc;

use openraft::storage::{RaftSnapshotBuilder, RaftStateMachine};
use openraft::{
    BasicNode, Entry, EntryPayload, LogId, Snapshot, SnapshotMeta, StorageError, StoredMembership,
};
use redb::{Database, ReadableDatabase, TableDefinition};
use tracing::{debug, info, trace};

use crate::error::{read_err, write_err};
use crate::typ::{Request, Response, TypeConfig};

const SM_META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("keel_sm_meta");

const APPLIED_KEY: &str = "last_applied";
const MEMBERSHIP_KEY: &str = "membership";

type Membership = StoredMembership<u64, BasicNode>;

/// Raft state machine tracking applied progress and membership.
pub struct StateMachine {
    db: Arc<Database>,
}

/// Builds snapshots from the stored metadata.
pub struct SmSnapshotBuilder {
    db: Arc<Database>,
}

fn read_meta<T: serde::de::DeserializeOwned>(
    db: &Database,
    key: &str,
) -> Result<Option<T>, StorageError<u64>> {
    let txn = db.begin_read().map_err(read_err)?;
    let table = txn.open_table(SM_META_TABLE).map_err(read_err)?;
    match table.get(key).map_err(read_err)? {
        Some(val) => Ok(Some(serde_json::from_slice(val.value()).map_err(read_err)?)),
        None => Ok(None),
    }
}

fn read_applied(db: &Database) -> Result<(Option<LogId<u64>>, Membership), StorageError<u64>> {
    let applied = read_meta(db, APPLIED_KEY)?;
    let membership = read_meta(db, MEMBERSHIP_KEY)?.unwrap_or_default();
    Ok((applied, membership))
}

impl StateMachine {
    /// Open the state machine table in `db`, creating it if missing.
    pub fn open(db: Arc<Database>) -> Result<Self, StorageError<u64>> {
        let txn = db.begin_write().map_err(write_err)?;
        txn.open_table(SM_META_TABLE).map_err(write_err)?;
        txn.commit().map_err(write_err)?;
        Ok(Self { db })
    }

    /// Apply one entry and record it as the last applied, in one transaction.
    fn apply_entry(&self, entry: Entry<TypeConfig>) -> Result<Response, StorageError<u64>> {
        let log_id = entry.log_id;
        let txn = self.db.begin_write().map_err(write_err)?;
        {
            let mut meta = txn.open_table(SM_META_TABLE).map_err(write_err)?;

            match entry.payload {
                EntryPayload::Blank | EntryPayload::Normal(Request::Probe) => {}
                EntryPayload::Membership(membership) => {
                    let stored = StoredMembership::new(Some(log_id), membership);
                    let data = serde_json::to_vec(&stored).map_err(write_err)?;
                    meta.insert(MEMBERSHIP_KEY, data.as_slice())
                        .map_err(write_err)?;
                }
            }

            let applied = serde_json::to_vec(&log_id).map_err(write_err)?;
            meta.insert(APPLIED_KEY, applied.as_slice())
                .map_err(write_err)?;
        }
        txn.commit().map_err(write_err)?;
        trace!(index = log_id.index, "applied entry");
        Ok(Response)
    }
}

impl RaftStateMachine<TypeConfig> for StateMachine {
    type SnapshotBuilder = SmSnapshotBuilder;

    async fn applied_state(
        &mut self,
    ) -> Result<(Option<LogId<u64>>, Membership), StorageError<u64>> {
        read_applied(&self.db)
    }

    async fn apply<I>(&mut self, entries: I) -> Result<Vec<Response>, StorageError<u64>>
    where
        I: IntoIterator<Item = Entry<TypeConfig>> + Send,
        I::IntoIter: Send,
    {
        entries
            .into_iter()
            .map(|entry| self.apply_entry(entry))
            .collect()
    }

    async fn get_snapshot_builder(&mut self) -> Self::SnapshotBuilder {
        SmSnapshotBuilder {
            db: Arc::clone(&self.db),
        }
    }

    async fn begin_receiving_snapshot(
        &mut self,
    ) -> Result<Box<Cursor<Vec<u8>>>, StorageError<u64>> {
        Ok(Box::new(Cursor::new(Vec::new())))
    }

    // Snapshot data carries no application state; the meta is everything.
    async fn install_snapshot(
        &mut self,
        meta: &SnapshotMeta<u64, BasicNode>,
        _snapshot: Box<Cursor<Vec<u8>>>,
    ) -> Result<(), StorageError<u64>> {
        let applied = serde_json::to_vec(&meta.last_log_id).map_err(write_err)?;
        let membership = serde_json::to_vec(&meta.last_membership).map_err(write_err)?;

        let txn = self.db.begin_write().map_err(write_err)?;
        {
            let mut meta_table = txn.open_table(SM_META_TABLE).map_err(write_err)?;
            meta_table
                .insert(APPLIED_KEY, applied.as_slice())
                .map_err(write_err)?;
            meta_table
                .insert(MEMBERSHIP_KEY, membership.as_slice())
                .map_err(write_err)?;
        }
        txn.commit().map_err(write_err)?;

        info!(snapshot_id = %meta.snapshot_id, "installed snapshot");
        Ok(())
    }

    async fn get_current_snapshot(
        &mut self,
    ) -> Result<Option<Snapshot<TypeConfig>>, StorageError<u64>> {
        if read_meta::<LogId<u64>>(&self.db, APPLIED_KEY)?.is_none() {
            return Ok(None);
        }
        let mut builder = self.get_snapshot_builder().await;
        builder.build_snapshot().await.map(Some)
    }
}

impl RaftSnapshotBuilder<TypeConfig> for SmSnapshotBuilder {
    async fn build_snapshot(&mut self) -> Result<Snapshot<TypeConfig>, StorageError<u64>> {
        let (last_log_id, last_membership) = read_applied(&self.db)?;
        let snapshot_id = format!("snap-{}", last_log_id.map_or(0, |l| l.index));
        debug!(%snapshot_id, "built snapshot");

        Ok(Snapshot {
            meta: SnapshotMeta {
                last_log_id,
                last_membership,
                snapshot_id,
            },
            snapshot: Box::new(Cursor::new(Vec::new())),
        })
    }
}
