//! Verdict → HTTP status and wire body.
//!
//! The `health` field is a JSON *string*, `"true"` or `"false"`.
//! Consumers parse it as a string, so it must never become a boolean.

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::evaluator::HealthVerdict;

/// Wire body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBody {
    pub health: String,
}

impl HealthBody {
    pub fn healthy() -> Self {
        Self {
            health: "true".to_string(),
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            health: "false".to_string(),
        }
    }
}

/// Map a verdict to `200 {"health":"true"}` or `503 {"health":"false"}`.
///
/// The reason stays out of the body; it is diagnostic only.
pub fn respond(verdict: &HealthVerdict) -> (StatusCode, HealthBody) {
    if verdict.is_healthy() {
        (StatusCode::OK, HealthBody::healthy())
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, HealthBody::unhealthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::UnhealthyReason;

    #[test]
    fn healthy_maps_to_200_with_string_true() {
        let (status, body) = respond(&HealthVerdict::healthy());
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"health":"true"}"#);
    }

    #[test]
    fn unhealthy_maps_to_503_with_string_false() {
        let verdict = HealthVerdict::unhealthy(UnhealthyReason::NoLeader);
        let (status, body) = respond(&verdict);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"health":"false"}"#);
    }

    #[test]
    fn body_rejects_boolean_literal() {
        assert!(serde_json::from_str::<HealthBody>(r#"{"health":true}"#).is_err());
        let body: HealthBody = serde_json::from_str(r#"{"health":"true"}"#).unwrap();
        assert_eq!(body, HealthBody::healthy());
    }
}
