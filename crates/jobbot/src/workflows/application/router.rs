use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::backend::JobBotBackend;
use super::domain::{Applicant, EnhancedResume, JobPosting};
use super::flow::{FlowAction, FlowError};
use super::payment::PaymentGateway;
use super::registry::FlowId;
use super::service::{ApplicationFlowService, FlowServiceError};

/// Body accepted when opening a flow.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenFlowRequest {
    pub job: JobPosting,
    pub applicant: Applicant,
}

/// Router builder exposing HTTP endpoints for application flows.
pub fn flow_router<B, P>(service: Arc<ApplicationFlowService<B, P>>) -> Router
where
    B: JobBotBackend + 'static,
    P: PaymentGateway + 'static,
{
    Router::new()
        .route("/api/v1/flows", post(open_handler::<B, P>))
        .route(
            "/api/v1/flows/:flow_id",
            get(view_handler::<B, P>).delete(close_handler::<B, P>),
        )
        .route(
            "/api/v1/flows/:flow_id/actions",
            post(action_handler::<B, P>),
        )
        .route(
            "/api/v1/flows/:flow_id/resume",
            get(resume_handler::<B, P>),
        )
        .with_state(service)
}

fn error_response(error: FlowServiceError) -> Response {
    let status = match &error {
        FlowServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        FlowServiceError::AlreadyApplied { .. }
        | FlowServiceError::Busy { .. }
        | FlowServiceError::ResumeNotReady(_) => StatusCode::CONFLICT,
        FlowServiceError::Flow(FlowError::InvalidTransition { .. }) => StatusCode::CONFLICT,
        FlowServiceError::Flow(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FlowServiceError::Backend(_) => StatusCode::BAD_GATEWAY,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn open_handler<B, P>(
    State(service): State<Arc<ApplicationFlowService<B, P>>>,
    axum::Json(request): axum::Json<OpenFlowRequest>,
) -> Response
where
    B: JobBotBackend + 'static,
    P: PaymentGateway + 'static,
{
    match service.open(request.job, request.applicant).await {
        Ok(snapshot) => (StatusCode::CREATED, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn view_handler<B, P>(
    State(service): State<Arc<ApplicationFlowService<B, P>>>,
    Path(flow_id): Path<String>,
) -> Response
where
    B: JobBotBackend + 'static,
    P: PaymentGateway + 'static,
{
    match service.view(&FlowId(flow_id)).await {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn action_handler<B, P>(
    State(service): State<Arc<ApplicationFlowService<B, P>>>,
    Path(flow_id): Path<String>,
    axum::Json(action): axum::Json<FlowAction>,
) -> Response
where
    B: JobBotBackend + 'static,
    P: PaymentGateway + 'static,
{
    match service.act(&FlowId(flow_id), action).await {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn close_handler<B, P>(
    State(service): State<Arc<ApplicationFlowService<B, P>>>,
    Path(flow_id): Path<String>,
) -> Response
where
    B: JobBotBackend + 'static,
    P: PaymentGateway + 'static,
{
    match service.close(&FlowId(flow_id)).await {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resume_handler<B, P>(
    State(service): State<Arc<ApplicationFlowService<B, P>>>,
    Path(flow_id): Path<String>,
) -> Response
where
    B: JobBotBackend + 'static,
    P: PaymentGateway + 'static,
{
    match service.enhanced_resume(&FlowId(flow_id)).await {
        Ok(resume) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!(
                        "attachment; filename=\"{}\"",
                        EnhancedResume::DOWNLOAD_NAME
                    ),
                ),
            ],
            resume.content,
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}
