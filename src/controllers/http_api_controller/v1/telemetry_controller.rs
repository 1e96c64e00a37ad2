use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::{
    dto::{BenchmarksRequest, ErrorResponse, TelemetryRequest},
    providers_controller::error_response,
};
use crate::context::Context;

pub(crate) async fn update_telemetry(
    State(context): State<Arc<Context>>,
    headers: HeaderMap,
    Json(raw): Json<serde_json::Value>,
) -> Response {
    let mut submission: TelemetryRequest = match serde_json::from_value(raw.clone()) {
        Ok(submission) => submission,
        Err(error) => {
            tracing::debug!(error = %error, "failed to parse telemetry body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "invalid request body".to_string(),
                }),
            )
                .into_response();
        }
    };

    submission.x_real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match context.ingest_service().update_telemetry(submission, raw) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_benchmarks(
    State(context): State<Arc<Context>>,
    Json(submission): Json<BenchmarksRequest>,
) -> Response {
    match context.ingest_service().update_benchmarks(submission) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(error) => error_response(error),
    }
}

/// Raw latest submissions, straight from the buffer. Operator-only; sits
/// behind the auth layer.
pub(crate) async fn latest_telemetry(State(context): State<Arc<Context>>) -> Response {
    Json(context.ingest_service().latest_telemetry()).into_response()
}

pub(crate) async fn health() -> Response {
    StatusCode::OK.into_response()
}
