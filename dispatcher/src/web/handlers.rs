// Console-facing batch operation endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::batch::{BatchResult, OperationKind, ResourceTarget};
use crate::cron::runner::CronRegistration;
use crate::cron::{CronEntry, CronKey};
use crate::errors::DispatchError;
use crate::web::AppState;

// Helper type for API responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct ScaleRequest {
    pub env: String,
    #[serde(default)]
    pub add_label: bool,
    #[serde(default)]
    pub interval_ms: u64,
    pub targets: Vec<ResourceTarget>,
}

#[derive(Deserialize)]
pub struct RestartRequest {
    pub env: String,
    #[serde(default)]
    pub interval_ms: u64,
    pub targets: Vec<ResourceTarget>,
}

#[derive(Deserialize)]
pub struct UpdateImageRequest {
    pub env: String,
    pub targets: Vec<ResourceTarget>,
}

#[derive(Deserialize)]
pub struct RegisterCronRequest {
    pub env: String,
    #[serde(default)]
    pub add_label: bool,
    pub targets: Vec<ResourceTarget>,
}

#[derive(Deserialize)]
pub struct CronKeyQuery {
    pub env: String,
    pub namespace: String,
    pub deployment: String,
}

/// Batch capacity scaling
pub async fn scale(
    State(state): State<AppState>,
    Json(request): Json<ScaleRequest>,
) -> ApiResult<BatchResult> {
    info!(
        "Scale request for '{}': {} targets, interval {}ms",
        request.env,
        request.targets.len(),
        request.interval_ms
    );

    state
        .batch_service
        .scale(
            &request.env,
            request.add_label,
            request.targets,
            request.interval_ms,
        )
        .await
        .map(|result| Json(ApiResponse::success(result)))
        .map_err(reject)
}

/// Batch rolling restart
pub async fn restart(
    State(state): State<AppState>,
    Json(request): Json<RestartRequest>,
) -> ApiResult<BatchResult> {
    info!(
        "Restart request for '{}': {} targets, interval {}ms",
        request.env,
        request.targets.len(),
        request.interval_ms
    );

    state
        .batch_service
        .restart(&request.env, request.targets, request.interval_ms)
        .await
        .map(|result| Json(ApiResponse::success(result)))
        .map_err(reject)
}

/// Batch image update
pub async fn update_image(
    State(state): State<AppState>,
    Json(request): Json<UpdateImageRequest>,
) -> ApiResult<BatchResult> {
    info!(
        "Image update request for '{}': {} targets",
        request.env,
        request.targets.len()
    );

    state
        .batch_service
        .update_image(&request.env, request.targets)
        .await
        .map(|result| Json(ApiResponse::success(result)))
        .map_err(reject)
}

/// Register (or replace) deferred scale entries
pub async fn register_cron(
    State(state): State<AppState>,
    Json(request): Json<RegisterCronRequest>,
) -> ApiResult<Vec<CronRegistration>> {
    info!(
        "Cron registration for '{}': {} targets",
        request.env,
        request.targets.len()
    );

    state
        .cron_runner
        .register(&request.env, request.add_label, request.targets)
        .await
        .map(|registrations| Json(ApiResponse::success(registrations)))
        .map_err(reject)
}

/// Remove a deferred scale entry; missing entries are a no-op
pub async fn unregister_cron(
    Query(query): Query<CronKeyQuery>,
    State(state): State<AppState>,
) -> ApiResult<serde_json::Value> {
    let key = CronKey {
        env: query.env,
        namespace: query.namespace,
        deployment: query.deployment,
        kind: OperationKind::CronScale,
    };

    match state.cron_runner.unregister(&key).await {
        Ok(removed) => Ok(Json(ApiResponse::success(serde_json::json!({
            "removed": removed
        })))),
        Err(e) => {
            error!("Failed to unregister cron entry: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            ))
        }
    }
}

/// List live cron entries
pub async fn list_cron(State(state): State<AppState>) -> ApiResult<Vec<CronEntry>> {
    let entries = state.cron_runner.entries().await;
    Ok(Json(ApiResponse::success(entries)))
}

/// Configured environment names for the console's environment picker
pub async fn list_environments(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(ApiResponse::success(state.batch_service.environments())))
}

fn reject(e: DispatchError) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = match &e {
        DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
        DispatchError::UnknownEnvironment { .. } => StatusCode::NOT_FOUND,
        DispatchError::AdmissionCheckUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        DispatchError::ScheduleFailed { .. } => StatusCode::BAD_REQUEST,
    };

    error!("Batch rejected: {}", e);
    (status, Json(ApiResponse::error(e.to_string())))
}
