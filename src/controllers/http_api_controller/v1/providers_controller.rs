use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::dto::{
    ContractChecksResponse, ErrorResponse, ProvidersResponse, SearchProvidersRequest,
};
use crate::{context::Context, services::ServiceError};

pub(crate) async fn search_providers(
    State(context): State<Arc<Context>>,
    Json(request): Json<SearchProvidersRequest>,
) -> Response {
    match context.provider_service().search_providers(request).await {
        Ok(providers) => Json(ProvidersResponse { providers }).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn contract_checks(
    State(context): State<Arc<Context>>,
    Path(pubkey): Path<String>,
) -> Response {
    match context.provider_service().get_contract_checks(&pubkey).await {
        Ok(checks) => Json(ContractChecksResponse { checks }).into_response(),
        Err(error) => error_response(error),
    }
}

/// Validation surfaces as 400; anything touching the database is a plain
/// 500 with no detail leaked.
pub(crate) fn error_response(error: ServiceError) -> Response {
    match error {
        ServiceError::BadRequest(message) => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
        }
        ServiceError::Repository(error) => {
            tracing::error!(error = %error, "repository error serving request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal server error".to_string(),
                }),
            )
                .into_response()
        }
    }
}
