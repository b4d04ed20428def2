//! Cluster alarms as seen by the health checker.
//!
//! Alarms are raised and cleared by the alarm subsystem. The checker only
//! ever reads a point-in-time copy through [`AlarmSource`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Cluster member identifier.
pub type MemberId = u64;

/// Kind of an operational fault raised by a member.
///
/// Known kinds have a stable wire name used by `?exclude=` filters.
/// Kinds reported by the alarm subsystem that this build does not know
/// are kept as [`AlarmKind::Unrecognized`] and always block health.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AlarmKind {
    /// Storage capacity exhausted.
    NoSpace,
    /// Data integrity violation detected.
    Corrupt,
    /// A kind not known to this build.
    Unrecognized(String),
}

impl AlarmKind {
    /// Every kind that can be named in an exclusion filter.
    pub const KNOWN: [AlarmKind; 2] = [AlarmKind::NoSpace, AlarmKind::Corrupt];

    /// Look up a known kind by its wire name (case-sensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NOSPACE" => Some(AlarmKind::NoSpace),
            "CORRUPT" => Some(AlarmKind::Corrupt),
            _ => None,
        }
    }

    /// Stable wire name.
    pub fn name(&self) -> &str {
        match self {
            AlarmKind::NoSpace => "NOSPACE",
            AlarmKind::Corrupt => "CORRUPT",
            AlarmKind::Unrecognized(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, AlarmKind::Unrecognized(_))
    }
}

impl fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for AlarmKind {
    fn from(name: String) -> Self {
        AlarmKind::from_name(&name).unwrap_or(AlarmKind::Unrecognized(name))
    }
}

impl From<AlarmKind> for String {
    fn from(kind: AlarmKind) -> Self {
        match kind {
            AlarmKind::Unrecognized(raw) => raw,
            known => known.name().to_string(),
        }
    }
}

/// One active alarm: which member raised it and what kind it is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub member_id: MemberId,
    #[serde(rename = "alarm")]
    pub kind: AlarmKind,
}

impl AlarmRecord {
    pub fn new(member_id: MemberId, kind: AlarmKind) -> Self {
        Self { member_id, kind }
    }
}

impl fmt::Display for AlarmRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member:{} alarm:{}", self.member_id, self.kind)
    }
}

/// Snapshot accessor for the set of active alarms.
///
/// Implementations must return a copy: later changes to the alarm set
/// must not be visible through a snapshot already handed out.
pub trait AlarmSource: Send + Sync + 'static {
    fn active_alarms(&self) -> Vec<AlarmRecord>;
}

/// In-process alarm set shared between the alarm admin API and the
/// health checker.
///
/// `Clone` shares the same underlying set.
#[derive(Debug, Clone, Default)]
pub struct AlarmStore {
    alarms: Arc<RwLock<BTreeSet<AlarmRecord>>>,
}

impl AlarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise an alarm. Returns `false` if it was already active.
    pub fn activate(&self, member_id: MemberId, kind: AlarmKind) -> bool {
        let record = AlarmRecord::new(member_id, kind);
        let mut alarms = self.alarms.write().unwrap_or_else(PoisonError::into_inner);
        let inserted = alarms.insert(record.clone());
        if inserted {
            info!(%record, "alarm activated");
        } else {
            debug!(%record, "alarm already active");
        }
        inserted
    }

    /// Clear an alarm. Returns `false` if it was not active.
    pub fn deactivate(&self, member_id: MemberId, kind: &AlarmKind) -> bool {
        let record = AlarmRecord::new(member_id, kind.clone());
        let mut alarms = self.alarms.write().unwrap_or_else(PoisonError::into_inner);
        let removed = alarms.remove(&record);
        if removed {
            info!(%record, "alarm deactivated");
        }
        removed
    }

    /// Point-in-time copy of the active alarms, ordered by member then kind.
    pub fn snapshot(&self) -> Vec<AlarmRecord> {
        let alarms = self.alarms.read().unwrap_or_else(PoisonError::into_inner);
        alarms.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl AlarmSource for AlarmStore {
    fn active_alarms(&self) -> Vec<AlarmRecord> {
        self.snapshot()
    }
}
