use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::{error, warn};

use super::orchestrator::{SubmissionOrchestrator, FAILURE_MESSAGE};
use super::sink::SinkKind;
use crate::survey::{validate_submission, LeadRecord};

/// Shared state for the submission endpoint.
///
/// `configured` lists the sinks whose settings are complete; the health route
/// reports it independently of which sinks the orchestrator delivers to.
#[derive(Debug, Clone)]
pub struct SubmissionState {
    pub orchestrator: Arc<SubmissionOrchestrator>,
    pub configured: Vec<SinkKind>,
}

impl SubmissionState {
    pub fn new(orchestrator: SubmissionOrchestrator, configured: Vec<SinkKind>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            configured,
        }
    }
}

pub fn submission_router(state: Arc<SubmissionState>) -> Router {
    Router::new()
        .route(
            "/api/submit-survey",
            get(health_handler).post(submit_handler),
        )
        .with_state(state)
}

pub(crate) async fn submit_handler(
    State(state): State<Arc<SubmissionState>>,
    payload: Result<axum::Json<LeadRecord>, JsonRejection>,
) -> Response {
    let lead = match payload {
        Ok(axum::Json(lead)) => lead,
        Err(rejection) => {
            warn!(error = %rejection, "malformed submission body");
            let payload = json!({
                "error": "Validation failed",
                "details": [rejection.body_text()],
            });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    if let Err(details) = validate_submission(&lead) {
        warn!(problems = details.len(), "submission failed validation");
        let payload = json!({
            "error": "Validation failed",
            "details": details,
        });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    }

    let orchestrator = Arc::clone(&state.orchestrator);
    let result = tokio::task::spawn_blocking(move || orchestrator.submit(&lead)).await;

    match result {
        Ok(result) if result.success => {
            let payload = json!({
                "success": true,
                "message": result.message,
                "integrations": result.integrations(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(result) => {
            let mut details = result.failures();
            if details.is_empty() {
                details.push("No delivery integrations are configured".to_string());
            }
            let payload = json!({
                "error": FAILURE_MESSAGE,
                "details": details,
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
        Err(join) => {
            error!(error = %join, "submission task aborted");
            let payload = json!({
                "error": FAILURE_MESSAGE,
                "details": ["Unknown error"],
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn health_handler(State(state): State<Arc<SubmissionState>>) -> Response {
    let configured = |kind: SinkKind| state.configured.contains(&kind);
    let payload = json!({
        "message": "Survey submission endpoint is running",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "config": {
            "crmConfigured": configured(SinkKind::Crm),
            "spreadsheetConfigured": configured(SinkKind::Spreadsheet),
            "emailConfigured": configured(SinkKind::Email),
        },
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}
