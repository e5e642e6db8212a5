// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_models::time_format;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

const TABLE: &str = "/rest/v1/appointments";

/// Finds appointments that hold a `(date, time)` slot.
pub struct ConflictDetectionService {
    supabase: Arc<SupabaseClient>,
}

fn occupying_filter() -> String {
    let statuses: Vec<&str> = AppointmentStatus::OCCUPYING.iter().map(|s| s.as_str()).collect();
    format!("status=in.({})", statuses.join(","))
}

impl ConflictDetectionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// The active appointment holding exactly this slot, ignoring `exclude`.
    pub async fn find_occupant(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        exclude: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        debug!("Checking occupancy of {} {}", date, time_format::format_time(&time));

        let mut path = format!(
            "{}?select=*&scheduled_date=eq.{}&scheduled_time=eq.{}&{}",
            TABLE,
            date.format("%Y-%m-%d"),
            time.format("%H:%M:%S"),
            occupying_filter(),
        );
        if let Some(id) = exclude {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let rows: Vec<Appointment> = self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().find(|a| a.status.occupies_slot() && Some(a.id) != exclude))
    }

    /// Start times on `date` already held by active appointments.
    pub async fn occupied_times(
        &self,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<NaiveTime>, AppointmentError> {
        debug!("Fetching occupied times for {}", date);

        let path = format!(
            "{}?select=*&scheduled_date=eq.{}&{}&order=scheduled_time.asc",
            TABLE,
            date.format("%Y-%m-%d"),
            occupying_filter(),
        );

        let rows: Vec<Appointment> = self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter(|a| a.status.occupies_slot())
            .map(|a| a.scheduled_time)
            .collect())
    }
}
