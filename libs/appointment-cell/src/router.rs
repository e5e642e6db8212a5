// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::admin_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // Booking wizard
    let public_routes = Router::new()
        .route("/", post(handlers::reserve_appointment))
        .route("/available-times", get(handlers::get_available_times));

    // Back office
    let admin_routes = Router::new()
        .route("/", get(handlers::search_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment).delete(handlers::delete_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/reschedule", put(handlers::reschedule_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), admin_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
