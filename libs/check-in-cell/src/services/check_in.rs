// libs/check-in-cell/src/services/check_in.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use appointment_cell::services::lifecycle::AppointmentLifecycleService;
use appointment_cell::{Appointment, AppointmentStatus};
use service_cell::ServiceCatalogService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::poll::{poll_until, PollConfig, PollOutcome};

use crate::models::{
    CheckInDetails, CheckInError, CheckInRecord, CheckInToken, CompleteCheckInRequest, Contract,
    IssuedCheckIn,
};
use crate::services::signature::normalize_signature;

const TOKENS: &str = "/rest/v1/check_in_tokens";
const CONTRACTS: &str = "/rest/v1/contracts";
const CHECK_INS: &str = "/rest/v1/check_ins";
const APPOINTMENTS: &str = "/rest/v1/appointments";

/// How often the wait endpoint looks for a finished check-in.
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const TOKEN_LENGTH: usize = 64;

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn well_formed(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_hexdigit())
}

pub struct CheckInService {
    supabase: Arc<SupabaseClient>,
    catalog: ServiceCatalogService,
    lifecycle: AppointmentLifecycleService,
    token_ttl: ChronoDuration,
}

impl CheckInService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            catalog: ServiceCatalogService::with_client(Arc::clone(&supabase)),
            lifecycle: AppointmentLifecycleService::new(),
            token_ttl: ChronoDuration::hours(config.check_in_token_ttl_hours.max(1)),
            supabase,
        }
    }

    async fn appointment(&self, id: Uuid, auth_token: Option<&str>) -> Result<Appointment, CheckInError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, id);
        let rows: Vec<Appointment> = self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| CheckInError::Database(e.to_string()))?;

        rows.into_iter().next().ok_or(CheckInError::AppointmentNotFound)
    }

    /// Issues a single-use link for an appointment that still holds its slot.
    pub async fn issue(&self, appointment_id: Uuid, auth_token: &str) -> Result<IssuedCheckIn, CheckInError> {
        let appointment = self.appointment(appointment_id, Some(auth_token)).await?;
        if !appointment.status.occupies_slot() {
            return Err(CheckInError::NotCheckable(appointment.status.to_string()));
        }

        let expires_at = Utc::now() + self.token_ttl;
        let row = json!({
            "token": new_token(),
            "appointment_id": appointment_id,
            "expires_at": expires_at.to_rfc3339(),
            "used_at": null,
        });

        let token: CheckInToken = self.supabase
            .insert(TOKENS, Some(auth_token), row)
            .await
            .map_err(|e| CheckInError::Database(e.to_string()))?;

        info!("Check-in link issued for appointment {} (expires {})", appointment_id, token.expires_at);
        Ok(IssuedCheckIn {
            token: token.token,
            appointment_id: token.appointment_id,
            expires_at: token.expires_at,
        })
    }

    async fn valid_token(&self, token: &str) -> Result<CheckInToken, CheckInError> {
        if !well_formed(token) {
            return Err(CheckInError::TokenNotFound);
        }

        let path = format!("{}?token=eq.{}", TOKENS, token);
        let rows: Vec<CheckInToken> = self.supabase
            .select(&path, None)
            .await
            .map_err(|e| CheckInError::Database(e.to_string()))?;

        let stored = rows.into_iter().next().ok_or(CheckInError::TokenNotFound)?;
        stored.ensure_valid(Utc::now())?;
        Ok(stored)
    }

    /// The service's own contract, or the clinic default.
    pub async fn contract_for(&self, service_id: Uuid) -> Result<Contract, CheckInError> {
        let specific = format!("{}?service_id=eq.{}&limit=1", CONTRACTS, service_id);
        let rows: Vec<Contract> = self.supabase
            .select(&specific, None)
            .await
            .map_err(|e| CheckInError::Database(e.to_string()))?;
        if let Some(contract) = rows.into_iter().next() {
            return Ok(contract);
        }

        debug!("No contract for service {}, using default", service_id);
        let fallback = format!("{}?is_default=eq.true&limit=1", CONTRACTS);
        let rows: Vec<Contract> = self.supabase
            .select(&fallback, None)
            .await
            .map_err(|e| CheckInError::Database(e.to_string()))?;

        rows.into_iter().next().ok_or(CheckInError::ContractMissing)
    }

    pub async fn details(&self, token: &str) -> Result<CheckInDetails, CheckInError> {
        let stored = self.valid_token(token).await?;
        let appointment = self.appointment(stored.appointment_id, None).await?;
        let service = self.catalog.get(appointment.service_id, None).await?;
        let contract = self.contract_for(service.id).await?;

        Ok(CheckInDetails {
            appointment,
            service,
            contract,
            expires_at: stored.expires_at,
        })
    }

    /// Records the signed contract. The token is consumed before anything
    /// else is written, so only one submission per link can succeed. If the
    /// record cannot be saved the token is released for a retry.
    pub async fn complete(&self, token: &str, request: CompleteCheckInRequest) -> Result<CheckInRecord, CheckInError> {
        let signer_name = request.signer_name.trim().to_string();
        if signer_name.is_empty() {
            return Err(CheckInError::Validation("signer_name is required".to_string()));
        }
        if !request.accepted_terms {
            return Err(CheckInError::TermsNotAccepted);
        }
        let signature = normalize_signature(&request.signature_image)?;

        let stored = self.valid_token(token).await?;
        let appointment = self.appointment(stored.appointment_id, None).await?;
        if !appointment.status.occupies_slot() {
            return Err(CheckInError::NotCheckable(appointment.status.to_string()));
        }
        let contract = self.contract_for(appointment.service_id).await?;

        // timestamptz keeps microseconds; the release filter matches this value exactly
        let used_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let consume_path = format!("{}?token=eq.{}&used_at=is.null", TOKENS, token);
        let consumed: Vec<CheckInToken> = self.supabase
            .update(&consume_path, None, json!({ "used_at": used_at }))
            .await
            .map_err(|e| CheckInError::Database(e.to_string()))?;
        if consumed.is_empty() {
            warn!("Check-in link for appointment {} submitted twice", appointment.id);
            return Err(CheckInError::TokenAlreadyUsed);
        }

        let inserted = self.supabase
            .insert::<CheckInRecord>(CHECK_INS, None, json!({
                "appointment_id": appointment.id,
                "contract_id": contract.id,
                "signer_name": signer_name,
                "signature_png": signature,
                "signed_at": used_at,
            }))
            .await;
        let record = match inserted {
            Ok(record) => record,
            Err(e) => {
                error!("Check-in record for appointment {} not saved: {}", appointment.id, e);
                self.release(token, &used_at).await;
                return Err(CheckInError::Database(e.to_string()));
            }
        };

        if self
            .lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Confirmed)
            .is_ok()
        {
            self.confirm(&appointment).await?;
        }

        info!("Appointment {} checked in by {}", appointment.id, record.signer_name);
        Ok(record)
    }

    /// Hands the link back after a failed submission. Only undoes our own
    /// consume, never a later one.
    async fn release(&self, token: &str, used_at: &str) {
        let path = format!("{}?token=eq.{}&used_at=eq.{}", TOKENS, token, used_at);
        match self.supabase.update::<CheckInToken>(&path, None, json!({ "used_at": null })).await {
            Ok(rows) if !rows.is_empty() => debug!("Check-in link released after failed submission"),
            Ok(_) => warn!("Check-in link was not released, consume marker changed"),
            Err(e) => error!("Failed to release check-in link: {}", e),
        }
    }

    async fn confirm(&self, appointment: &Appointment) -> Result<(), CheckInError> {
        let path = format!(
            "{}?id=eq.{}&status=eq.{}",
            APPOINTMENTS,
            appointment.id,
            AppointmentStatus::Pending
        );
        let rows: Vec<Appointment> = self.supabase
            .update(&path, None, json!({
                "status": AppointmentStatus::Confirmed,
                "updated_at": Utc::now().to_rfc3339(),
            }))
            .await
            .map_err(|e| CheckInError::Database(e.to_string()))?;

        if rows.is_empty() {
            debug!("Appointment {} changed status before check-in confirmation", appointment.id);
        } else {
            info!("Appointment {} confirmed by check-in", appointment.id);
        }
        Ok(())
    }

    pub async fn find_record(&self, appointment_id: Uuid, auth_token: &str) -> Result<Option<CheckInRecord>, CheckInError> {
        let path = format!("{}?appointment_id=eq.{}&order=signed_at.desc&limit=1", CHECK_INS, appointment_id);
        let rows: Vec<CheckInRecord> = self.supabase
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| CheckInError::Database(e.to_string()))?;
        Ok(rows.into_iter().next())
    }

    /// Waits until the patient finishes check-in, `timeout` passes, or
    /// `cancel` fires.
    pub async fn wait_for_check_in(
        &self,
        appointment_id: Uuid,
        timeout: Duration,
        cancel: CancellationToken,
        auth_token: &str,
    ) -> Result<CheckInRecord, CheckInError> {
        debug!("Waiting up to {:?} for check-in of appointment {}", timeout, appointment_id);

        let config = PollConfig::new(WAIT_POLL_INTERVAL, timeout);
        let outcome = poll_until(config, cancel, || self.find_record(appointment_id, auth_token)).await?;

        match outcome {
            PollOutcome::Ready(record) => Ok(record),
            PollOutcome::TimedOut => Err(CheckInError::WaitTimedOut),
            PollOutcome::Cancelled => {
                debug!("Wait for appointment {} cancelled", appointment_id);
                Err(CheckInError::WaitCancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_tokens_are_long_and_unique() {
        let a = new_token();
        let b = new_token();
        assert!(well_formed(&a));
        assert_ne!(a, b);
        assert!(!well_formed("abc&used_at=not.is.null"));
    }

    #[tokio::test]
    async fn test_cancelled_wait_is_reported_as_cancelled() {
        let service = CheckInService::new(&AppConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = service
            .wait_for_check_in(Uuid::new_v4(), Duration::from_secs(5), cancel, "token")
            .await;

        assert_matches!(result, Err(CheckInError::WaitCancelled));
    }
}
