// libs/service-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::admin_middleware;

use crate::handlers;

pub fn service_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_services))
        .route("/{id}", get(handlers::get_service));

    let admin_routes = Router::new()
        .route("/", post(handlers::create_service))
        .route("/all", get(handlers::list_all_services))
        .route("/{id}", put(handlers::update_service).delete(handlers::delete_service))
        .layer(middleware::from_fn_with_state(state.clone(), admin_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
