// libs/appointment-cell/src/services/reservation.rs
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, NaiveTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use availability_cell::models::{BlockedInterval, CandidateSlot};
use availability_cell::services::{evaluator, BlockedDateService};
use service_cell::ServiceCatalogService;
use shared_config::{AppConfig, MalformedIntervalPolicy};
use shared_database::supabase::{api_error, SupabaseClient};
use shared_models::time_format;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, ReserveAppointmentRequest};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::patients::PatientDirectory;

const TABLE: &str = "/rest/v1/appointments";

/// The only path that writes an appointment into a slot. Every write re-reads
/// the blocked dates and runs the evaluator before touching the store.
pub struct ReservationService {
    supabase: Arc<SupabaseClient>,
    blocked_dates: BlockedDateService,
    catalog: ServiceCatalogService,
    conflicts: ConflictDetectionService,
    patients: PatientDirectory,
    lifecycle: AppointmentLifecycleService,
    clinic_offset: FixedOffset,
    policy: MalformedIntervalPolicy,
}

impl ReservationService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            blocked_dates: BlockedDateService::with_client(Arc::clone(&supabase)),
            catalog: ServiceCatalogService::with_client(Arc::clone(&supabase)),
            conflicts: ConflictDetectionService::new(Arc::clone(&supabase)),
            patients: PatientDirectory::new(Arc::clone(&supabase)),
            lifecycle: AppointmentLifecycleService::new(),
            clinic_offset: config.clinic_offset(),
            policy: config.malformed_interval_policy,
            supabase,
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.clinic_offset).date_naive()
    }

    /// Books a new `pending` appointment for a public visitor.
    pub async fn reserve(&self, request: ReserveAppointmentRequest) -> Result<Appointment, AppointmentError> {
        let request = request.validate()?;
        info!(
            "Reservation requested for service {} at {} {}",
            request.service_id,
            request.scheduled_date,
            time_format::format_time(&request.scheduled_time)
        );

        let service = self.catalog.get_bookable(request.service_id, None).await?;

        self.authorize_slot(
            request.scheduled_date,
            request.scheduled_time,
            i64::from(service.duration_minutes),
            None,
            None,
        )
        .await?;

        let patient = self.patients.find_or_create(&request.patient_info, None).await?;

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "service_id": service.id,
            "patient_id": patient.id,
            "scheduled_date": request.scheduled_date.format("%Y-%m-%d").to_string(),
            "scheduled_time": time_format::format_time(&request.scheduled_time),
            "status": AppointmentStatus::Pending,
            "notes": request.notes,
            "created_at": now,
            "updated_at": now,
        });

        let appointment: Appointment = self.supabase
            .insert(TABLE, None, row)
            .await
            .map_err(|e| self.map_write_error(e, request.scheduled_date, request.scheduled_time))?;

        info!(
            "Appointment {} reserved for patient {} at {} {}",
            appointment.id,
            patient.id,
            appointment.scheduled_date,
            time_format::format_time(&appointment.scheduled_time)
        );
        Ok(appointment)
    }

    /// Moves an active appointment to another slot under the same rules as
    /// [`ReservationService::reserve`].
    pub async fn reschedule(
        &self,
        appointment: &Appointment,
        date: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.lifecycle.validate_reschedule(appointment.status)?;
        debug!("Rescheduling appointment {} to {} {}", appointment.id, date, time_format::format_time(&time));

        let service = self.catalog.get(appointment.service_id, Some(auth_token)).await?;

        self.authorize_slot(
            date,
            time,
            i64::from(service.duration_minutes),
            Some(appointment.id),
            Some(auth_token),
        )
        .await?;

        let changes = json!({
            "scheduled_date": date.format("%Y-%m-%d").to_string(),
            "scheduled_time": time_format::format_time(&time),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("{}?id=eq.{}", TABLE, appointment.id);
        let mut rows: Vec<Appointment> = self.supabase
            .update(&path, Some(auth_token), changes)
            .await
            .map_err(|e| self.map_write_error(e, date, time))?;

        if rows.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} rescheduled to {} {}", appointment.id, date, time_format::format_time(&time));
        Ok(rows.remove(0))
    }

    /// Evaluator, visit span, then occupancy. Nothing is written here.
    pub async fn authorize_slot(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i64,
        exclude: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<(), AppointmentError> {
        let intervals: Vec<BlockedInterval> = self.blocked_dates.list(auth_token).await?;

        let decision = evaluator::evaluate(&CandidateSlot::at(date, time), self.today(), &intervals, self.policy);
        if !decision.malformed.is_empty() {
            warn!("Reservation check at {} skipped malformed blocked dates {:?}", date, decision.malformed);
        }

        if !decision.available {
            info!(
                "Slot {} {} refused: {:?}",
                date,
                time_format::format_time(&time),
                decision.reason
            );
            return Err(AppointmentError::SlotUnavailable(decision.message().to_string()));
        }

        if let Some(range) = evaluator::span_conflict(date, time, duration_minutes, &intervals, self.policy) {
            info!(
                "Slot {} {} refused: visit runs into block {}-{}",
                date,
                time_format::format_time(&time),
                time_format::format_time(&range.start),
                time_format::format_time(&range.end)
            );
            return Err(AppointmentError::SlotUnavailable(
                "The treatment would run into a blocked period".to_string(),
            ));
        }

        if let Some(occupant) = self.conflicts.find_occupant(date, time, exclude, auth_token).await? {
            warn!(
                "Slot {} {} already held by appointment {}",
                date,
                time_format::format_time(&time),
                occupant.id
            );
            return Err(AppointmentError::SlotTaken);
        }

        Ok(())
    }

    /// A unique violation means another request won the slot between the
    /// occupancy check and the write. A foreign key violation means the
    /// service went away after it was loaded.
    fn map_write_error(&self, err: anyhow::Error, date: NaiveDate, time: NaiveTime) -> AppointmentError {
        match api_error(&err) {
            Some(api) if api.is_unique_violation() => {
                warn!(
                    "Slot {} {} taken by a concurrent reservation",
                    date,
                    time_format::format_time(&time)
                );
                AppointmentError::SlotTaken
            }
            Some(api) if api.is_foreign_key_violation() => {
                info!("Reservation for {} {} refused: {}", date, time_format::format_time(&time), api.message);
                AppointmentError::ServiceNotFound
            }
            _ => AppointmentError::DatabaseError(err.to_string()),
        }
    }
}
