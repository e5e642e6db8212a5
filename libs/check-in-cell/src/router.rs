// libs/check-in-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::admin_middleware;

use crate::handlers;

pub fn check_in_routes(state: Arc<AppConfig>) -> Router {
    // Patient link, no login
    let public_routes = Router::new()
        .route("/{token}", get(handlers::get_check_in))
        .route("/{token}/complete", post(handlers::complete_check_in));

    // Front desk
    let admin_routes = Router::new()
        .route("/", post(handlers::issue_check_in))
        .route("/appointments/{appointment_id}/wait", get(handlers::wait_for_check_in))
        .layer(middleware::from_fn_with_state(state.clone(), admin_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
