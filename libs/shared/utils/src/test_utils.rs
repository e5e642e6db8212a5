use std::sync::Arc;
use chrono::{Duration, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{SessionContext, User};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            ..AppConfig::default()
        }
    }

    /// Config pointed at a mock store.
    pub fn with_store(store_url: &str) -> AppConfig {
        let mut config = Self::default().to_app_config();
        config.supabase_url = store_url.to_string();
        config
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "staff".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, "staff")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn to_session(&self, token: &str) -> SessionContext {
        SessionContext::new(self.to_user(), token)
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "app_metadata": { "role": user.role },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Row shapes as the REST API returns them (times carry seconds).
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn all_day_block(start: NaiveDate, end: NaiveDate) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "start_date": start.format("%Y-%m-%d").to_string(),
            "end_date": end.format("%Y-%m-%d").to_string(),
            "all_day": true,
            "start_time": null,
            "end_time": null,
            "reason": "Clinic closed",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn partial_block(date: NaiveDate, start_time: &str, end_time: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "start_date": date.format("%Y-%m-%d").to_string(),
            "end_date": date.format("%Y-%m-%d").to_string(),
            "all_day": false,
            "start_time": format!("{}:00", start_time),
            "end_time": format!("{}:00", end_time),
            "reason": "Staff training",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn service_response(service_id: &str, duration_minutes: i32, is_active: bool) -> serde_json::Value {
        json!({
            "id": service_id,
            "name": "Hydrafacial",
            "description": "Deep cleansing facial",
            "duration_minutes": duration_minutes,
            "price_cents": 19900,
            "is_active": is_active,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_response(patient_id: &str, email: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "first_name": "Ava",
            "last_name": "Reyes",
            "email": email,
            "phone": "+15555550100",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: &str,
        service_id: &str,
        patient_id: &str,
        date: NaiveDate,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "service_id": service_id,
            "patient_id": patient_id,
            "scheduled_date": date.format("%Y-%m-%d").to_string(),
            "scheduled_time": format!("{}:00", time),
            "status": status,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn unique_violation() -> serde_json::Value {
        json!({
            "code": "23505",
            "details": "Key (scheduled_date, scheduled_time) already exists.",
            "hint": null,
            "message": "duplicate key value violates unique constraint \"appointments_active_slot_key\""
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "code": code,
            "message": message
        })
    }
}
