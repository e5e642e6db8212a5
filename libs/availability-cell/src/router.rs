// libs/availability-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::admin_middleware;

use crate::handlers;

pub fn blocked_date_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_blocked_dates));

    // Only admins change what is blocked
    let admin_routes = Router::new()
        .route("/", post(handlers::create_blocked_date))
        .route("/{id}", put(handlers::update_blocked_date).delete(handlers::delete_blocked_date))
        .layer(middleware::from_fn_with_state(state.clone(), admin_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/check", get(handlers::check_availability))
        .route("/calendar", get(handlers::get_calendar))
        .with_state(state)
}
