//! Health check outcome counters and their Prometheus exposition.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::evaluator::HealthVerdict;

#[derive(Debug, Default)]
struct Counts {
    successes: AtomicU64,
    failures: AtomicU64,
}

/// Running totals of `/health` outcomes. `Clone` shares the counts.
#[derive(Debug, Clone, Default)]
pub struct HealthCounters {
    counts: Arc<Counts>,
}

impl HealthCounters {
    /// Count one evaluation.
    pub fn record(&self, verdict: &HealthVerdict) {
        let counter = if verdict.is_healthy() {
            &self.counts.successes
        } else {
            &self.counts.failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn successes(&self) -> u64 {
        self.counts.successes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.counts.failures.load(Ordering::Relaxed)
    }
}

/// Render the counters in Prometheus text exposition format.
pub fn render_prometheus(counters: &HealthCounters) -> String {
    let mut out = String::new();

    out.push_str("# HELP keel_server_health_success_total The total number of successful health checks.\n");
    out.push_str("# TYPE keel_server_health_success_total counter\n");
    out.push_str(&format!(
        "keel_server_health_success_total {}\n",
        counters.successes()
    ));

    out.push_str("# HELP keel_server_health_failures_total The total number of failed health checks.\n");
    out.push_str("# TYPE keel_server_health_failures_total counter\n");
    out.push_str(&format!(
        "keel_server_health_failures_total {}\n",
        counters.failures()
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::UnhealthyReason;

    #[test]
    fn clones_share_counts() {
        let counters = HealthCounters::default();
        let shared = counters.clone();
        shared.record(&HealthVerdict::healthy());
        shared.record(&HealthVerdict::unhealthy(UnhealthyReason::NoLeader));
        assert_eq!(counters.successes(), 1);
        assert_eq!(counters.failures(), 1);
    }

    #[test]
    fn exposition_contains_both_series() {
        let counters = HealthCounters::default();
        counters.record(&HealthVerdict::healthy());
        counters.record(&HealthVerdict::healthy());

        let text = render_prometheus(&counters);
        assert!(text.contains("# TYPE keel_server_health_success_total counter"));
        assert!(text.contains("keel_server_health_success_total 2\n"));
        assert!(text.contains("keel_server_health_failures_total 0\n"));
    }
}
