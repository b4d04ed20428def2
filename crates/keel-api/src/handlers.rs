//! HTTP handlers.
//!
//! `/health` writes its own stable body. The alarm admin routes use the
//! `{success, data, error}` envelope.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::debug;

use keel_health::{AlarmKind, ConsensusProbe, ExclusionSet, MemberId, render_prometheus, respond};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Health ─────────────────────────────────────────────────────

/// GET /health
///
/// Query pairs are taken raw so repeated `exclude` keys all survive.
pub async fn health<P: ConsensusProbe>(
    State(state): State<ApiState<P>>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let exclusions = ExclusionSet::from_query_pairs(&params);
    let verdict = state.checker.check(&exclusions).await;
    let (status, body) = respond(&verdict);
    debug!(status = status.as_u16(), "/health responded");

    (status, Json(body))
}

// ── Metrics ────────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics<P: ConsensusProbe>(
    State(state): State<ApiState<P>>,
) -> impl IntoResponse {
    let body = render_prometheus(state.checker.counters());
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

// ── Alarms ─────────────────────────────────────────────────────

fn parse_kind(raw: &str) -> Result<AlarmKind, axum::response::Response> {
    AlarmKind::from_name(raw).ok_or_else(|| {
        error_response(&format!("unknown alarm kind {raw:?}"), StatusCode::BAD_REQUEST)
            .into_response()
    })
}

/// GET /v1/alarms
pub async fn list_alarms<P: ConsensusProbe>(
    State(state): State<ApiState<P>>,
) -> impl IntoResponse {
    ApiResponse::ok(state.alarms.snapshot())
}

/// PUT /v1/alarms/:member/:kind
pub async fn raise_alarm<P: ConsensusProbe>(
    State(state): State<ApiState<P>>,
    Path((member, kind)): Path<(MemberId, String)>,
) -> impl IntoResponse {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };

    let status = if state.alarms.activate(member, kind) {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, ApiResponse::ok(state.alarms.snapshot())).into_response()
}

/// DELETE /v1/alarms/:member/:kind
pub async fn clear_alarm<P: ConsensusProbe>(
    State(state): State<ApiState<P>>,
    Path((member, kind)): Path<(MemberId, String)>,
) -> impl IntoResponse {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };

    if state.alarms.deactivate(member, &kind) {
        ApiResponse::ok(state.alarms.snapshot()).into_response()
    } else {
        error_response("alarm not active", StatusCode::NOT_FOUND).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use http_body_util::BodyExt;
    use keel_health::{AlarmStore, HealthChecker, HealthConfig, ProbeError};

    struct StaticProbe {
        leader: Option<MemberId>,
        healthy: bool,
    }

    impl ConsensusProbe for StaticProbe {
        fn leader(&self) -> Option<MemberId> {
            self.leader
        }

        async fn probe(&self) -> Result<(), ProbeError> {
            if self.healthy {
                Ok(())
            } else {
                Err(ProbeError::Rejected("fail health check".to_string()))
            }
        }
    }

    fn test_state(leader: Option<MemberId>, healthy: bool) -> ApiState<StaticProbe> {
        let alarms = AlarmStore::new();
        let config = HealthConfig {
            probe_timeout: Duration::from_millis(200),
        };
        let checker = HealthChecker::new(alarms.clone(), StaticProbe { leader, healthy }, config);
        ApiState::new(checker, alarms)
    }

    fn query(raw: &[(&str, &str)]) -> Query<Vec<(String, String)>> {
        Query(
            raw.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    async fn body_string(resp: axum::response::Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_ok_body_is_exact() {
        let state = test_state(Some(1), true);
        let resp = health(State(state), query(&[])).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, r#"{"health":"true"}"#);
    }

    #[tokio::test]
    async fn health_probe_failure_is_503() {
        let state = test_state(Some(1), false);
        let resp = health(State(state), query(&[])).await.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_string(resp).await, r#"{"health":"false"}"#);
    }

    #[tokio::test]
    async fn health_exclusion_clears_alarm() {
        let state = test_state(Some(1), true);
        state.alarms.activate(0, AlarmKind::NoSpace);

        let resp = health(State(state.clone()), query(&[])).await.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = health(State(state), query(&[("exclude", "NOSPACE")]))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn raise_then_clear_alarm() {
        let state = test_state(Some(1), true);

        let resp = raise_alarm(State(state.clone()), Path((3, "CORRUPT".to_string())))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = raise_alarm(State(state.clone()), Path((3, "CORRUPT".to_string())))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = clear_alarm(State(state.clone()), Path((3, "CORRUPT".to_string())))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.alarms.is_empty());
    }

    #[tokio::test]
    async fn clear_inactive_alarm_is_404() {
        let state = test_state(Some(1), true);
        let resp = clear_alarm(State(state), Path((3, "NOSPACE".to_string())))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_alarm_kind_is_400() {
        let state = test_state(Some(1), true);
        let resp = raise_alarm(State(state), Path((3, "nospace".to_string())))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_alarms_returns_envelope() {
        let state = test_state(Some(1), true);
        state.alarms.activate(1, AlarmKind::NoSpace);

        let resp = list_alarms(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["alarm"], "NOSPACE");
        assert_eq!(body["data"][0]["member_id"], 1);
    }

    #[tokio::test]
    async fn metrics_count_health_outcomes() {
        let state = test_state(None, true);
        health(State(state.clone()), query(&[])).await;

        let resp = prometheus_metrics(State(state)).await.into_response();
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/plain"));
        let text = body_string(resp).await;
        assert!(text.contains("keel_server_health_failures_total 1\n"));
        assert!(text.contains("keel_server_health_success_total 0\n"));
    }
}
