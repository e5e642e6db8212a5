// libs/appointment-cell/src/services/management.rs
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    RescheduleAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::reservation::ReservationService;

const TABLE: &str = "/rest/v1/appointments";

/// Back-office operations on existing appointments.
pub struct AppointmentManagementService {
    supabase: Arc<SupabaseClient>,
    lifecycle: AppointmentLifecycleService,
    reservations: ReservationService,
}

impl AppointmentManagementService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            lifecycle: AppointmentLifecycleService::new(),
            reservations: ReservationService::new(config),
        }
    }

    pub async fn search(&self, query: &AppointmentSearchQuery, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        query.validate()?;
        debug!("Searching appointments with {:?}", query);

        let mut filters = vec!["select=*".to_string()];
        if let Some(from) = query.from {
            filters.push(format!("scheduled_date=gte.{}", from.format("%Y-%m-%d")));
        }
        if let Some(to) = query.to {
            filters.push(format!("scheduled_date=lte.{}", to.format("%Y-%m-%d")));
        }
        if let Some(status) = query.status {
            filters.push(format!("status=eq.{}", status));
        }
        filters.push("order=scheduled_date.asc,scheduled_time.asc".to_string());
        filters.push(format!("limit={}", query.page_size()));
        if let Some(offset) = query.offset {
            filters.push(format!("offset={}", offset));
        }

        let path = format!("{}?{}", TABLE, filters.join("&"));
        self.supabase
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }

    pub async fn get(&self, id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?id=eq.{}", TABLE, id);
        let mut rows: Vec<Appointment> = self.supabase
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if rows.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(rows.remove(0))
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get(id, auth_token).await?;
        self.lifecycle.validate_status_transition(current.status, new_status)?;

        // Guarded on the status we validated against so a concurrent change
        // is not overwritten.
        let path = format!("{}?id=eq.{}&status=eq.{}", TABLE, id, current.status);
        let changes = json!({
            "status": new_status,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut rows: Vec<Appointment> = self.supabase
            .update(&path, Some(auth_token), changes)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if rows.is_empty() {
            return Err(AppointmentError::InvalidStatusTransition { from: current.status, to: new_status });
        }

        info!("Appointment {} moved from {} to {}", id, current.status, new_status);
        Ok(rows.remove(0))
    }

    pub async fn reschedule(
        &self,
        id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get(id, auth_token).await?;
        self.reservations
            .reschedule(&current, request.scheduled_date, request.scheduled_time, auth_token)
            .await
    }

    pub async fn delete(&self, id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        debug!("Deleting appointment {}", id);

        let path = format!("{}?id=eq.{}", TABLE, id);
        let rows: Vec<Appointment> = self.supabase
            .delete(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if rows.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} deleted", id);
        Ok(())
    }
}
