// libs/check-in-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use tokio_util::sync::CancellationToken;
use tracing::error;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::SessionContext;
use shared_models::error::AppError;

use crate::models::{
    CheckInDetails, CheckInRecord, CompleteCheckInRequest, IssueCheckInRequest, IssuedCheckIn,
    WaitQuery,
};
use crate::services::CheckInService;

#[axum::debug_handler]
pub async fn issue_check_in(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<IssueCheckInRequest>,
) -> Result<(StatusCode, Json<IssuedCheckIn>), AppError> {
    let service = CheckInService::new(&state);
    let issued = service.issue(request.appointment_id, session.token()).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

#[axum::debug_handler]
pub async fn get_check_in(
    State(state): State<Arc<AppConfig>>,
    Path(token): Path<String>,
) -> Result<Json<CheckInDetails>, AppError> {
    let service = CheckInService::new(&state);
    Ok(Json(service.details(&token).await?))
}

#[axum::debug_handler]
pub async fn complete_check_in(
    State(state): State<Arc<AppConfig>>,
    Path(token): Path<String>,
    Json(request): Json<CompleteCheckInRequest>,
) -> Result<Json<CheckInRecord>, AppError> {
    let service = CheckInService::new(&state);
    Ok(Json(service.complete(&token, request).await?))
}

/// Long-poll for the front desk. If the caller goes away, dropping this
/// future drops the guard and cancels the poll task.
#[axum::debug_handler]
pub async fn wait_for_check_in(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Path(appointment_id): Path<Uuid>,
    Query(query): Query<WaitQuery>,
) -> Result<Json<CheckInRecord>, AppError> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let service = CheckInService::new(&state);
    let access_token = session.token().to_string();
    let timeout = query.timeout();

    let task = tokio::spawn(async move {
        service
            .wait_for_check_in(appointment_id, timeout, cancel, &access_token)
            .await
    });

    match task.await {
        Ok(result) => Ok(Json(result?)),
        Err(e) => {
            error!("Check-in wait task failed: {}", e);
            Err(AppError::Internal("Check-in wait failed".to_string()))
        }
    }
}
