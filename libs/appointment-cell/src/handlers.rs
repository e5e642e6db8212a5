// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::SessionContext;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentSearchQuery, AvailableTimesQuery, AvailableTimesResponse,
    RescheduleAppointmentRequest, ReserveAppointmentRequest, UpdateStatusRequest,
};
use crate::services::{AppointmentManagementService, ReservationService, SlotService};

// ==============================================================================
// PUBLIC BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn reserve_appointment(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<ReserveAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let reservations = ReservationService::new(&state);
    let appointment = reservations.reserve(request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn get_available_times(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AvailableTimesQuery>,
) -> Result<Json<AvailableTimesResponse>, AppError> {
    let slots = SlotService::new(&state);
    Ok(Json(slots.available_times(query.date, query.service_id).await?))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let management = AppointmentManagementService::new(&state);
    Ok(Json(management.search(&query, session.token()).await?))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let management = AppointmentManagementService::new(&state);
    Ok(Json(management.get(appointment_id, session.token()).await?))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    let management = AppointmentManagementService::new(&state);
    let appointment = management
        .update_status(appointment_id, request.status, session.token())
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let management = AppointmentManagementService::new(&state);
    let appointment = management
        .reschedule(appointment_id, request, session.token())
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let management = AppointmentManagementService::new(&state);
    management.delete(appointment_id, session.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}
