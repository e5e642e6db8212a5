// libs/service-cell/src/services/catalog.rs
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{api_error, SupabaseClient};

use crate::models::{CreateServiceRequest, Service, ServiceCatalogError, UpdateServiceRequest};

const TABLE: &str = "/rest/v1/services";

/// Postgres error code for a foreign key violation.
pub struct ServiceCatalogService {
    supabase: Arc<SupabaseClient>,
}

impl ServiceCatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Catalogue in name order; retired services only when `include_inactive`.
    pub async fn list(&self, include_inactive: bool, auth_token: Option<&str>) -> Result<Vec<Service>, ServiceCatalogError> {
        debug!("Listing services (include_inactive: {})", include_inactive);

        let mut path = format!("{}?select=*&order=name.asc", TABLE);
        if !include_inactive {
            path.push_str("&is_active=eq.true");
        }

        self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| ServiceCatalogError::Database(e.to_string()))
    }

    pub async fn get(&self, id: Uuid, auth_token: Option<&str>) -> Result<Service, ServiceCatalogError> {
        debug!("Fetching service {}", id);

        let path = format!("{}?id=eq.{}", TABLE, id);
        let mut rows: Vec<Service> = self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| ServiceCatalogError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(ServiceCatalogError::NotFound);
        }
        Ok(rows.remove(0))
    }

    /// A service that can be booked right now.
    pub async fn get_bookable(&self, id: Uuid, auth_token: Option<&str>) -> Result<Service, ServiceCatalogError> {
        let service = self.get(id, auth_token).await?;
        if !service.is_active {
            return Err(ServiceCatalogError::Inactive);
        }
        Ok(service)
    }

    pub async fn create(&self, request: CreateServiceRequest, auth_token: &str) -> Result<Service, ServiceCatalogError> {
        let request = request.validate()?;
        debug!("Creating service {}", request.name);

        let mut row = request.to_row();
        row["created_at"] = json!(Utc::now().to_rfc3339());
        row["updated_at"] = json!(Utc::now().to_rfc3339());

        let service: Service = self.supabase
            .insert(TABLE, Some(auth_token), row)
            .await
            .map_err(|e| ServiceCatalogError::Database(e.to_string()))?;

        info!("Service {} created ({})", service.id, service.name);
        Ok(service)
    }

    pub async fn update(&self, id: Uuid, request: UpdateServiceRequest, auth_token: &str) -> Result<Service, ServiceCatalogError> {
        let mut changes = request.to_changes()?;
        changes["updated_at"] = json!(Utc::now().to_rfc3339());
        debug!("Updating service {}", id);

        let path = format!("{}?id=eq.{}", TABLE, id);
        let mut rows: Vec<Service> = self.supabase
            .update(&path, Some(auth_token), changes)
            .await
            .map_err(|e| ServiceCatalogError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(ServiceCatalogError::NotFound);
        }

        info!("Service {} updated", id);
        Ok(rows.remove(0))
    }

    pub async fn delete(&self, id: Uuid, auth_token: &str) -> Result<(), ServiceCatalogError> {
        debug!("Deleting service {}", id);

        let path = format!("{}?id=eq.{}", TABLE, id);
        let rows: Vec<Service> = self.supabase
            .delete(&path, Some(auth_token))
            .await
            .map_err(|e| match api_error(&e) {
                Some(api) if api.is_foreign_key_violation() => ServiceCatalogError::InUse,
                _ => ServiceCatalogError::Database(e.to_string()),
            })?;

        if rows.is_empty() {
            return Err(ServiceCatalogError::NotFound);
        }

        info!("Service {} deleted", id);
        Ok(())
    }
}
