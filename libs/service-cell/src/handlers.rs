// libs/service-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::SessionContext;
use shared_models::error::AppError;

use crate::models::{CreateServiceRequest, Service, UpdateServiceRequest};
use crate::services::ServiceCatalogService;

#[axum::debug_handler]
pub async fn list_services(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Vec<Service>>, AppError> {
    let catalog = ServiceCatalogService::new(&state);
    Ok(Json(catalog.list(false, None).await?))
}

/// Admin view including retired services.
#[axum::debug_handler]
pub async fn list_all_services(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<Service>>, AppError> {
    let catalog = ServiceCatalogService::new(&state);
    Ok(Json(catalog.list(true, Some(session.token())).await?))
}

#[axum::debug_handler]
pub async fn get_service(
    State(state): State<Arc<AppConfig>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Service>, AppError> {
    let catalog = ServiceCatalogService::new(&state);
    Ok(Json(catalog.get(id, None).await?))
}

#[axum::debug_handler]
pub async fn create_service(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    let catalog = ServiceCatalogService::new(&state);
    let service = catalog.create(request, session.token()).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

#[axum::debug_handler]
pub async fn update_service(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<Json<Service>, AppError> {
    let catalog = ServiceCatalogService::new(&state);
    Ok(Json(catalog.update(id, request, session.token()).await?))
}

#[axum::debug_handler]
pub async fn delete_service(
    State(state): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let catalog = ServiceCatalogService::new(&state);
    catalog.delete(id, session.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}
