use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    /// Staff role. The auth provider puts `authenticated` in the top-level
    /// `role` claim, so the application role lives in `app_metadata.role`.
    pub fn effective_role(&self) -> Option<String> {
        self.app_metadata
            .as_ref()
            .and_then(|meta| meta.get("role"))
            .and_then(|role| role.as_str())
            .map(str::to_string)
            .or_else(|| self.role.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

/// Authenticated caller for the current request: who they are and the bearer
/// token to forward to the store. Inserted by the auth middleware and handed
/// to handlers explicitly.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user: User,
    pub access_token: String,
}

impl SessionContext {
    pub fn new(user: User, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: access_token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.access_token
    }
}
