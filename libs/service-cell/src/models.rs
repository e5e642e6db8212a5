// libs/service-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

/// A bookable treatment. `duration_minutes` sizes the appointment span.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price_cents: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CreateServiceRequest {
    pub fn validate(mut self) -> Result<Self, ServiceCatalogError> {
        self.name = validate_name(&self.name)?;
        validate_duration(self.duration_minutes)?;
        validate_price(self.price_cents)?;
        self.description = self.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
        Ok(self)
    }

    pub fn to_row(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "duration_minutes": self.duration_minutes,
            "price_cents": self.price_cents,
            "is_active": self.is_active,
        })
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub price_cents: Option<i64>,
    pub is_active: Option<bool>,
}

impl UpdateServiceRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.duration_minutes.is_none()
            && self.price_cents.is_none()
            && self.is_active.is_none()
    }

    /// Validated column changes, ready for a PATCH.
    pub fn to_changes(&self) -> Result<Value, ServiceCatalogError> {
        if self.is_empty() {
            return Err(ServiceCatalogError::Validation("No fields to update".to_string()));
        }

        let mut changes = Map::new();
        if let Some(name) = &self.name {
            changes.insert("name".to_string(), json!(validate_name(name)?));
        }
        if let Some(description) = &self.description {
            let trimmed = description.trim();
            let value = if trimmed.is_empty() { Value::Null } else { json!(trimmed) };
            changes.insert("description".to_string(), value);
        }
        if let Some(duration) = self.duration_minutes {
            validate_duration(duration)?;
            changes.insert("duration_minutes".to_string(), json!(duration));
        }
        if let Some(price) = self.price_cents {
            validate_price(price)?;
            changes.insert("price_cents".to_string(), json!(price));
        }
        if let Some(active) = self.is_active {
            changes.insert("is_active".to_string(), json!(active));
        }

        Ok(Value::Object(changes))
    }
}

fn validate_name(name: &str) -> Result<String, ServiceCatalogError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceCatalogError::Validation("Service name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_duration(duration_minutes: i32) -> Result<(), ServiceCatalogError> {
    if duration_minutes <= 0 {
        return Err(ServiceCatalogError::Validation("duration_minutes must be positive".to_string()));
    }
    Ok(())
}

fn validate_price(price_cents: i64) -> Result<(), ServiceCatalogError> {
    if price_cents < 0 {
        return Err(ServiceCatalogError::Validation("price_cents must not be negative".to_string()));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ServiceCatalogError {
    #[error("Service not found")]
    NotFound,

    #[error("Service is not currently offered")]
    Inactive,

    #[error("Service is still referenced by appointments")]
    InUse,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<ServiceCatalogError> for AppError {
    fn from(err: ServiceCatalogError) -> Self {
        match err {
            ServiceCatalogError::NotFound => AppError::NotFound("Service not found".to_string()),
            ServiceCatalogError::Inactive => AppError::BadRequest(err.to_string()),
            ServiceCatalogError::InUse => AppError::Conflict(err.to_string()),
            ServiceCatalogError::Validation(msg) => AppError::ValidationError(msg),
            ServiceCatalogError::Database(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn create_request() -> CreateServiceRequest {
        CreateServiceRequest {
            name: "  Botox  ".to_string(),
            description: Some("   ".to_string()),
            duration_minutes: 45,
            price_cents: 35000,
            is_active: true,
        }
    }

    #[test]
    fn test_create_request_is_normalized() {
        let request = create_request().validate().unwrap();
        assert_eq!(request.name, "Botox");
        assert!(request.description.is_none());
    }

    #[test]
    fn test_create_request_rejects_bad_fields() {
        let mut blank = create_request();
        blank.name = " ".to_string();
        assert_matches!(blank.validate(), Err(ServiceCatalogError::Validation(_)));

        let mut zero = create_request();
        zero.duration_minutes = 0;
        assert_matches!(zero.validate(), Err(ServiceCatalogError::Validation(_)));

        let mut negative = create_request();
        negative.price_cents = -1;
        assert_matches!(negative.validate(), Err(ServiceCatalogError::Validation(_)));
    }

    #[test]
    fn test_update_changes_only_carry_present_fields() {
        let update = UpdateServiceRequest {
            price_cents: Some(0),
            is_active: Some(false),
            ..Default::default()
        };
        let changes = update.to_changes().unwrap();

        assert_eq!(changes, json!({ "price_cents": 0, "is_active": false }));
    }

    #[test]
    fn test_empty_update_is_rejected() {
        assert_matches!(
            UpdateServiceRequest::default().to_changes(),
            Err(ServiceCatalogError::Validation(_))
        );
    }

    #[test]
    fn test_inactive_maps_to_bad_request() {
        let app_error: AppError = ServiceCatalogError::Inactive.into();
        assert_matches!(app_error, AppError::BadRequest(_));
    }
}
