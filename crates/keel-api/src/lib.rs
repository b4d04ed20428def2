//! keel-api — HTTP surface of a keel node.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health` | Node health; repeatable `?exclude=<ALARM>` |
//! | GET | `/metrics` | Prometheus exposition of health check counts |
//! | GET | `/v1/alarms` | List active alarms |
//! | PUT | `/v1/alarms/{member}/{kind}` | Raise an alarm |
//! | DELETE | `/v1/alarms/{member}/{kind}` | Clear an alarm |
//!
//! `/health` only ever answers 200 or 503. Other methods on it are
//! rejected by the router with 405.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, put};
use keel_health::{AlarmStore, ConsensusProbe, HealthChecker};

/// Shared state for API handlers.
pub struct ApiState<P> {
    pub checker: Arc<HealthChecker<AlarmStore, P>>,
    pub alarms: AlarmStore,
}

impl<P> ApiState<P> {
    pub fn new(checker: HealthChecker<AlarmStore, P>, alarms: AlarmStore) -> Self {
        Self {
            checker: Arc::new(checker),
            alarms,
        }
    }
}

impl<P> Clone for ApiState<P> {
    fn clone(&self) -> Self {
        Self {
            checker: Arc::clone(&self.checker),
            alarms: self.alarms.clone(),
        }
    }
}

/// Build the complete router.
pub fn build_router<P: ConsensusProbe>(state: ApiState<P>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::<P>))
        .route("/metrics", get(handlers::prometheus_metrics::<P>))
        .route("/v1/alarms", get(handlers::list_alarms::<P>))
        .route(
            "/v1/alarms/{member}/{kind}",
            put(handlers::raise_alarm::<P>).delete(handlers::clear_alarm::<P>),
        )
        .with_state(state)
}
