// libs/availability-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::SessionContext;
use shared_models::error::AppError;
use shared_models::time_format;

use crate::models::{
    AvailabilityCheckQuery, BlockedInterval, BlockedIntervalInput, CalendarQuery, CandidateSlot,
    DayAvailability,
};
use crate::services::{evaluator, BlockedDateService};

/// Longest range `GET /availability/calendar` will evaluate in one call.
pub const MAX_CALENDAR_DAYS: i64 = 93;

// ==============================================================================
// BLOCKED DATE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_blocked_dates(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Vec<BlockedInterval>>, AppError> {
    let service = BlockedDateService::new(&state);
    let intervals = service.list(None).await?;
    Ok(Json(intervals))
}

#[axum::debug_handler]
pub async fn create_blocked_date(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<BlockedIntervalInput>,
) -> Result<(StatusCode, Json<BlockedInterval>), AppError> {
    let service = BlockedDateService::new(&state);
    let interval = service.create(request, session.token()).await?;
    Ok((StatusCode::CREATED, Json(interval)))
}

#[axum::debug_handler]
pub async fn update_blocked_date(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<BlockedIntervalInput>,
) -> Result<Json<BlockedInterval>, AppError> {
    let service = BlockedDateService::new(&state);
    let interval = service.update(id, request, session.token()).await?;
    Ok(Json(interval))
}

#[axum::debug_handler]
pub async fn delete_blocked_date(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = BlockedDateService::new(&state);
    service.delete(id, session.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// AVAILABILITY PREVIEW HANDLERS
// ==============================================================================

/// Same evaluation the reservation endpoint performs, for graying out the
/// booking calendar before submit.
#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AvailabilityCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let service = BlockedDateService::new(&state);
    let intervals = service.list(None).await?;

    let candidate = CandidateSlot { date: query.date, time: query.time };
    let decision = evaluator::evaluate(
        &candidate,
        state.clinic_today(),
        &intervals,
        state.malformed_interval_policy,
    );

    if !decision.malformed.is_empty() {
        warn!("Availability check for {} skipped malformed intervals {:?}", query.date, decision.malformed);
    }

    Ok(Json(json!({
        "date": query.date.format("%Y-%m-%d").to_string(),
        "time": query.time.as_ref().map(time_format::format_time),
        "available": decision.available,
        "reason": decision.reason,
        "message": decision.message(),
    })))
}

#[axum::debug_handler]
pub async fn get_calendar(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Vec<DayAvailability>>, AppError> {
    if query.to < query.from {
        return Err(AppError::ValidationError("'to' must not be before 'from'".to_string()));
    }
    if (query.to - query.from).num_days() >= MAX_CALENDAR_DAYS {
        return Err(AppError::ValidationError(format!(
            "Calendar range may span at most {} days",
            MAX_CALENDAR_DAYS
        )));
    }

    let service = BlockedDateService::new(&state);
    let intervals = service.list_between(query.from, query.to, None).await?;

    Ok(Json(evaluator::calendar(
        query.from,
        query.to,
        state.clinic_today(),
        &intervals,
        state.malformed_interval_policy,
    )))
}
