use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Postgres error code for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";
/// Postgres error code for a foreign key violation.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Non-2xx response from the REST API. Carried inside the `anyhow::Error`
/// returned by [`SupabaseClient::request`] so callers can downcast it.
#[derive(Debug, Error)]
#[error("API error ({status}): {message}")]
pub struct SupabaseApiError {
    pub status: u16,
    /// Postgres / PostgREST error code when the body carried one.
    pub code: Option<String>,
    pub message: String,
}

impl SupabaseApiError {
    /// A 409 only counts when the body carried no code; PostgREST also
    /// answers 409 for foreign-key violations.
    pub fn is_unique_violation(&self) -> bool {
        match self.code.as_deref() {
            Some(code) => code == UNIQUE_VIOLATION,
            None => self.status == 409,
        }
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        self.code.as_deref() == Some(FOREIGN_KEY_VIOLATION)
    }

    fn from_body(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let code = parsed
            .as_ref()
            .and_then(|v| v.get("code"))
            .and_then(|c| c.as_str())
            .map(str::to_string);
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());

        Self { status, code, message }
    }
}

/// Find the [`SupabaseApiError`] inside an error returned by the client.
pub fn api_error(err: &anyhow::Error) -> Option<&SupabaseApiError> {
    err.downcast_ref::<SupabaseApiError>()
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: Option<String>,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        let service_role_key = if config.supabase_service_role_key.is_empty() {
            None
        } else {
            Some(config.supabase_service_role_key.clone())
        };

        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_role_key,
        }
    }

    /// Requests without a caller token run with the service key when one is
    /// configured, otherwise with the anon key.
    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = auth_token
            .or(self.service_role_key.as_deref())
            .unwrap_or(&self.anon_key);

        if !bearer.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", bearer))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                code => SupabaseApiError::from_body(code, &error_text).into(),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// `Prefer: return=representation` so writes echo the affected rows.
    pub fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    pub async fn select<T>(&self, path: &str, auth_token: Option<&str>) -> Result<Vec<T>>
    where T: DeserializeOwned {
        self.request(Method::GET, path, auth_token, None).await
    }

    pub async fn insert<T>(&self, table_path: &str, auth_token: Option<&str>, row: Value) -> Result<T>
    where T: DeserializeOwned {
        let mut rows: Vec<T> = self.request_with_headers(
            Method::POST,
            table_path,
            auth_token,
            Some(row),
            Some(Self::representation_headers()),
        ).await?;

        if rows.is_empty() {
            return Err(anyhow!("Insert into {} returned no rows", table_path));
        }
        Ok(rows.remove(0))
    }

    /// PATCH returning the updated rows; empty when the filter matched nothing.
    pub async fn update<T>(&self, path: &str, auth_token: Option<&str>, changes: Value) -> Result<Vec<T>>
    where T: DeserializeOwned {
        self.request_with_headers(
            Method::PATCH,
            path,
            auth_token,
            Some(changes),
            Some(Self::representation_headers()),
        ).await
    }

    /// DELETE returning the removed rows; empty when the filter matched nothing.
    pub async fn delete<T>(&self, path: &str, auth_token: Option<&str>) -> Result<Vec<T>>
    where T: DeserializeOwned {
        self.request_with_headers(
            Method::DELETE,
            path,
            auth_token,
            None,
            Some(Self::representation_headers()),
        ).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detected_from_body_code() {
        let err = SupabaseApiError::from_body(
            409,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        );
        assert!(err.is_unique_violation());
        assert_eq!(err.message, "duplicate key value violates unique constraint");
    }

    #[test]
    fn test_foreign_key_conflict_is_not_a_unique_violation() {
        let err = SupabaseApiError::from_body(
            409,
            r#"{"code":"23503","message":"insert or update on table \"appointments\" violates foreign key constraint"}"#,
        );
        assert!(!err.is_unique_violation());
        assert!(err.is_foreign_key_violation());

        let bare = SupabaseApiError::from_body(409, "");
        assert!(bare.is_unique_violation());
    }

    #[test]
    fn test_plain_text_body_kept_as_message() {
        let err = SupabaseApiError::from_body(500, "upstream exploded");
        assert!(!err.is_unique_violation());
        assert_eq!(err.message, "upstream exploded");
        assert!(err.code.is_none());
    }

    #[test]
    fn test_api_error_downcast() {
        let err: anyhow::Error = SupabaseApiError::from_body(404, "{}").into();
        assert_eq!(api_error(&err).map(|e| e.status), Some(404));
    }
}
