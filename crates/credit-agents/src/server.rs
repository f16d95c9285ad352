//! HTTP surface.
//!
//! Three routes over one shared `EvaluationService`. Every evaluation error
//! becomes `500 {"detail": "..."}`; malformed JSON bodies are rejected by
//! axum's `Json` extractor before a handler runs.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, routing::post, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::api::{
    ErrorResponse, GroupEvaluationRequest, GroupEvaluationResponse, HealthResponse,
    SingleEvaluationRequest, SingleEvaluationResponse,
};
use crate::errors::EvaluationError;
use crate::evaluator::EvaluationService;
use crate::prompts::PROMPT_VERSION;

pub const SERVICE_NAME: &str = "credit-agents";

pub struct AppState {
    pub service: EvaluationService,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn build_router(service: EvaluationService) -> Router {
    let enable_cors = service.config().enable_cors;
    let state = Arc::new(AppState { service });

    let mut router = Router::new()
        .route("/api/evaluate_group", post(evaluate_group))
        .route("/api/evaluate", post(evaluate_single))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Serve on an already-bound listener until the process stops.
pub async fn serve_on(listener: TcpListener, service: EvaluationService) -> Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    info!(%addr, "Credit evaluation server listening");
    axum::serve(listener, build_router(service))
        .await
        .context("HTTP server terminated")
}

pub async fn serve(bind_addr: &str, service: EvaluationService) -> Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid bind address {bind_addr:?}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    serve_on(listener, service).await
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        prompt_version: PROMPT_VERSION.to_string(),
    })
}

async fn evaluate_group(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GroupEvaluationRequest>,
) -> Result<Json<GroupEvaluationResponse>, ApiError> {
    state
        .service
        .evaluate_group(req)
        .await
        .map(|out| Json(out.response))
        .map_err(to_api_error)
}

async fn evaluate_single(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SingleEvaluationRequest>,
) -> Result<Json<SingleEvaluationResponse>, ApiError> {
    state
        .service
        .evaluate_single(req)
        .await
        .map(|out| Json(out.response))
        .map_err(to_api_error)
}

fn to_api_error(err: EvaluationError) -> ApiError {
    if err.is_client_error() {
        warn!(kind = err.kind(), error = %err, "Rejected evaluation request");
    } else {
        error!(kind = err.kind(), error = %err, "Evaluation request failed");
    }
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            detail: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use arbitration::ExtractionFailure;
    use arbitration::EvaluationMode;

    use super::*;

    #[test]
    fn every_error_maps_to_500_with_detail() {
        let (status, Json(body)) = to_api_error(
            ExtractionFailure {
                mode: EvaluationMode::Group,
                messages_scanned: 6,
                candidates_rejected: 0,
            }
            .into(),
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.detail.contains("valid verdict"));

        let (status, _) = to_api_error(EvaluationError::InvalidRequest("empty".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_reports_service() {
        let Json(body) = health_check().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.service, SERVICE_NAME);
    }
}
