//! Health evaluation: alarms, then leader, then the replicated-log probe.
//!
//! Each stage is terminal on failure and nothing is retried. A caller
//! that wants resilience against a transient probe failure polls again.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::alarm::{AlarmKind, AlarmRecord, AlarmSource};
use crate::counters::HealthCounters;
use crate::exclusion::ExclusionSet;
use crate::probe::{ConsensusProbe, ProbeError};

/// Default deadline for one liveness probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Health checker parameters.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Deadline for the replicated-log probe. Expiry counts as failure.
    pub probe_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Why a node was reported unhealthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnhealthyReason {
    /// A non-excluded alarm is active.
    Alarm(AlarmKind),
    /// No leader is currently observed.
    NoLeader,
    /// The replicated-log probe failed.
    Probe(ProbeError),
}

impl fmt::Display for UnhealthyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnhealthyReason::Alarm(AlarmKind::Unrecognized(raw)) => {
                write!(f, "ALARM UNKNOWN({raw})")
            }
            UnhealthyReason::Alarm(kind) => write!(f, "ALARM {kind}"),
            UnhealthyReason::NoLeader => f.write_str("RAFT NO LEADER"),
            UnhealthyReason::Probe(e) => write!(f, "PROBE ERROR: {e}"),
        }
    }
}

/// Outcome of one health evaluation. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthVerdict {
    reason: Option<UnhealthyReason>,
}

impl HealthVerdict {
    pub fn healthy() -> Self {
        Self { reason: None }
    }

    pub fn unhealthy(reason: UnhealthyReason) -> Self {
        Self {
            reason: Some(reason),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.reason.is_none()
    }

    /// Diagnostic reason; `None` when healthy.
    pub fn reason(&self) -> Option<&UnhealthyReason> {
        self.reason.as_ref()
    }
}

/// First alarm not covered by the exclusion set, if any.
///
/// Multiplicity is irrelevant: any single remaining alarm fails the
/// check.
pub fn first_blocking_alarm<'a>(
    alarms: &'a [AlarmRecord],
    exclusions: &ExclusionSet,
) -> Option<&'a AlarmRecord> {
    alarms.iter().find(|alarm| {
        let excluded = exclusions.excludes(&alarm.kind);
        if excluded {
            debug!(alarm = %alarm, "/health excluded alarm");
        }
        !excluded
    })
}

/// Fuses the alarm snapshot, leader state and liveness probe into one
/// verdict.
///
/// Holds no per-request state; share it behind an `Arc` across handlers.
pub struct HealthChecker<A, P> {
    alarms: A,
    probe: Arc<P>,
    config: HealthConfig,
    counters: HealthCounters,
}

impl<A: AlarmSource, P: ConsensusProbe> HealthChecker<A, P> {
    pub fn new(alarms: A, probe: P, config: HealthConfig) -> Self {
        Self {
            alarms,
            probe: Arc::new(probe),
            config,
            counters: HealthCounters::default(),
        }
    }

    /// Take an alarm snapshot, evaluate it and count the outcome.
    pub async fn check(&self, exclusions: &ExclusionSet) -> HealthVerdict {
        for token in exclusions.unrecognized() {
            debug!(%token, "ignoring unrecognized alarm exclusion");
        }

        let alarms = self.alarms.active_alarms();
        let verdict = self.evaluate(&alarms, exclusions).await;
        self.counters.record(&verdict);
        verdict
    }

    /// Evaluate an already-taken alarm snapshot against the consensus layer.
    pub async fn evaluate(
        &self,
        alarms: &[AlarmRecord],
        exclusions: &ExclusionSet,
    ) -> HealthVerdict {
        if let Some(alarm) = first_blocking_alarm(alarms, exclusions) {
            warn!(alarm = %alarm, "serving /health false due to an alarm");
            return HealthVerdict::unhealthy(UnhealthyReason::Alarm(alarm.kind.clone()));
        }

        let Some(leader) = self.probe.leader() else {
            warn!("serving /health false; no leader");
            return HealthVerdict::unhealthy(UnhealthyReason::NoLeader);
        };

        match self.run_probe().await {
            Ok(()) => {
                debug!(leader, "serving /health true");
                HealthVerdict::healthy()
            }
            Err(e) => {
                warn!(leader, error = %e, "serving /health false; probe failed");
                HealthVerdict::unhealthy(UnhealthyReason::Probe(e))
            }
        }
    }

    /// Run the probe on its own task under the configured deadline.
    ///
    /// If the caller goes away or the deadline passes, the spawned probe
    /// still runs to completion; only its result is discarded.
    async fn run_probe(&self) -> Result<(), ProbeError> {
        let probe = Arc::clone(&self.probe);
        let handle = tokio::spawn(async move { probe.probe().await });

        match tokio::time::timeout(self.config.probe_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ProbeError::Unavailable(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(self.config.probe_timeout)),
        }
    }

    /// Success and failure counts since startup.
    pub fn counters(&self) -> &HealthCounters {
        &self.counters
    }
}
