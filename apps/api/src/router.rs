use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::appointment_routes;
use availability_cell::{availability_routes, blocked_date_routes};
use check_in_cell::check_in_routes;
use service_cell::service_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Med-spa booking API is running!" }))
        .nest("/blocked-dates", blocked_date_routes(state.clone()))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/services", service_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/check-in", check_in_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(TestConfig::default().to_arc())
    }

    #[tokio::test]
    async fn test_root_reports_running() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cells_are_mounted() {
        let response = app()
            .oneshot(Request::builder().uri("/availability/calendar?from=2031-02-01&to=2031-01-01").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(Request::builder().method("POST").uri("/blocked-dates").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app()
            .oneshot(Request::builder().uri("/check-in/not-a-token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
