use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
    body::Body,
};

use headers::{authorization::Bearer, Authorization, HeaderMapExt};

use shared_models::auth::{SessionContext, User};
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

fn bearer_token(request: &Request<Body>) -> Result<String, AppError> {
    if !request.headers().contains_key(AUTHORIZATION) {
        return Err(AppError::Auth("Missing authorization header".to_string()));
    }

    request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

fn authenticate(config: &AppConfig, request: &mut Request<Body>) -> Result<SessionContext, AppError> {
    let token = bearer_token(request)?;

    let user = validate_token(&token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    let session = SessionContext::new(user.clone(), token);
    request.extensions_mut().insert(user);
    request.extensions_mut().insert(session.clone());
    Ok(session)
}

/// Validates the bearer token and makes the caller available to handlers as
/// `Extension<SessionContext>` (and `Extension<User>`).
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    authenticate(&config, &mut request)?;
    Ok(next.run(request).await)
}

/// Same as [`auth_middleware`] but only lets staff with the admin role through.
pub async fn admin_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = authenticate(&config, &mut request)?;
    require_admin(&session.user)?;
    Ok(next.run(request).await)
}

pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        tracing::warn!("User {} attempted an admin-only operation", user.id);
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}
