use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::info;

use portalnav::{NavigationError, ResumableWorkflowController, RunRequest, StatusSnapshot};

use crate::types::{
    HealthResponse, PageSelectionRequest, PageSelectionResponse, StartRunRequest,
    StartRunResponse, StopResponse,
};

// ============================================================================
// Error Handling
// ============================================================================

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<NavigationError> for ApiError {
    fn from(err: NavigationError) -> Self {
        let status = match err {
            // A second start, or input outside its suspend point.
            NavigationError::InvalidState(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({
                "error": self.message
            })),
        )
            .into_response()
    }
}

// ============================================================================
// Health Check
// ============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Start Run
// ============================================================================

pub async fn start_run(
    State(controller): State<Arc<ResumableWorkflowController>>,
    Json(request): Json<StartRunRequest>,
) -> Result<(StatusCode, Json<StartRunResponse>), ApiError> {
    info!("POST /api/run/start - mode: {}", request.mode);

    let mode = request.run_mode().map_err(ApiError::bad_request)?;
    let run_id = controller.start(RunRequest::new(mode)).await?;

    info!("run accepted: {run_id}");
    Ok((
        StatusCode::ACCEPTED,
        Json(StartRunResponse {
            status: "accepted".to_string(),
            run_id,
        }),
    ))
}

// ============================================================================
// Get Status
// ============================================================================

pub async fn get_status(
    State(controller): State<Arc<ResumableWorkflowController>>,
) -> Json<StatusSnapshot> {
    Json(controller.status().await)
}

// ============================================================================
// Page Selection
// ============================================================================

pub async fn page_selection(
    State(controller): State<Arc<ResumableWorkflowController>>,
    Json(request): Json<PageSelectionRequest>,
) -> Result<(StatusCode, Json<PageSelectionResponse>), ApiError> {
    info!("POST /api/run/page-selection - page: {}", request.page);

    controller.submit_page_selection(request.page).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PageSelectionResponse {
            status: "accepted".to_string(),
            page: request.page,
        }),
    ))
}

// ============================================================================
// Stop Run
// ============================================================================

pub async fn stop_run(
    State(controller): State<Arc<ResumableWorkflowController>>,
) -> (StatusCode, Json<StopResponse>) {
    info!("POST /api/run/stop");

    controller.stop().await;

    (
        StatusCode::ACCEPTED,
        Json(StopResponse {
            status: "stopping".to_string(),
        }),
    )
}
