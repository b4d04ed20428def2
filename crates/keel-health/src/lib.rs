//! keel-health — health evaluation for a keel cluster node.
//!
//! Decides whether a node is safe to treat as "up": reachable is not
//! enough, the node must be able to commit through the replicated log
//! and must not be blocked behind an active cluster alarm.
//!
//! # Architecture
//!
//! ```text
//! GET /health?exclude=NOSPACE
//!   ├── ExclusionSet::from_query_pairs()   (never fails)
//!   ├── HealthChecker::check()
//!   │   ├── AlarmSource::active_alarms()  → first non-excluded alarm fails
//!   │   ├── ConsensusProbe::leader()      → no leader fails
//!   │   └── ConsensusProbe::probe()       → bounded by probe_timeout
//!   └── respond() → (200 | 503, {"health": "true" | "false"})
//! ```
//!
//! The alarm subsystem and the consensus layer are consumed only through
//! the [`AlarmSource`] and [`ConsensusProbe`] traits. The checker holds no
//! per-request state; every call reads one alarm snapshot and one leader
//! reading, in that order.

pub mod alarm;
pub mod counters;
pub mod evaluator;
pub mod exclusion;
pub mod probe;
pub mod responder;

pub use alarm::{AlarmKind, AlarmRecord, AlarmSource, AlarmStore, MemberId};
pub use counters::{render_prometheus, HealthCounters};
pub use evaluator::{HealthChecker, HealthConfig, HealthVerdict, UnhealthyReason};
pub use exclusion::{ExclusionSet, EXCLUDE_PARAM};
pub use probe::{ConsensusProbe, ProbeError};
pub use responder::{respond, HealthBody};
