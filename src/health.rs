use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    pub status: String,
    pub tools: usize,
    pub model_transport: String,
    pub consecutive_failures: u32,
}

pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "ok" })
}

pub async fn readiness(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let tools = state.registry.len();
    let tools_ok = tools > 0;
    if !tools_ok {
        tracing::error!("Readiness check: tool registry empty");
    }

    let degraded = state.health.is_degraded(state.args.degraded_threshold);
    if degraded {
        tracing::error!("Readiness check: model transport failing");
    }

    let ready = tools_ok && !degraded;
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "unready" }.to_string(),
            tools,
            model_transport: if degraded { "degraded" } else { "ok" }.to_string(),
            consecutive_failures: state.health.consecutive_failures.load(Ordering::Relaxed),
        }),
    )
}
