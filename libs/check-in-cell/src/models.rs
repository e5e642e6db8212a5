// libs/check-in-cell/src/models.rs
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::{Appointment, AppointmentError};
use service_cell::{Service, ServiceCatalogError};
use shared_models::error::AppError;

// ==============================================================================
// TOKENS
// ==============================================================================

/// Single-use link handed to a patient for signing the treatment contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckInToken {
    pub token: String,
    pub appointment_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid,
    Used,
    Expired,
}

impl CheckInToken {
    /// A used token reports `Used` even after it expires.
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        if self.used_at.is_some() {
            TokenState::Used
        } else if now >= self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Valid
        }
    }

    pub fn ensure_valid(&self, now: DateTime<Utc>) -> Result<(), CheckInError> {
        match self.state(now) {
            TokenState::Valid => Ok(()),
            TokenState::Used => Err(CheckInError::TokenAlreadyUsed),
            TokenState::Expired => Err(CheckInError::TokenExpired),
        }
    }
}

// ==============================================================================
// CONTRACTS AND RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contract {
    pub id: Uuid,
    pub service_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub is_default: bool,
}

/// A completed check-in. The signature image is stored but never echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckInRecord {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub contract_id: Uuid,
    pub signer_name: String,
    #[serde(default, skip_serializing)]
    pub signature_png: String,
    pub signed_at: DateTime<Utc>,
}

// ==============================================================================
// REQUESTS AND RESPONSES
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCheckInRequest {
    pub appointment_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCheckIn {
    pub token: String,
    pub appointment_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// What the patient sees before signing.
#[derive(Debug, Clone, Serialize)]
pub struct CheckInDetails {
    pub appointment: Appointment,
    pub service: Service,
    pub contract: Contract,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteCheckInRequest {
    pub signer_name: String,
    /// Base64 PNG, optionally as a `data:image/png;base64,` URL.
    pub signature_image: String,
    #[serde(default)]
    pub accepted_terms: bool,
}

pub const DEFAULT_WAIT_SECS: u64 = 30;
pub const MAX_WAIT_SECS: u64 = 120;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaitQuery {
    pub timeout_secs: Option<u64>,
}

impl WaitQuery {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_WAIT_SECS).clamp(1, MAX_WAIT_SECS))
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum CheckInError {
    #[error("Check-in link not found")]
    TokenNotFound,

    #[error("Check-in link has expired")]
    TokenExpired,

    #[error("Check-in link has already been used")]
    TokenAlreadyUsed,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Appointment is {0} and cannot be checked in")]
    NotCheckable(String),

    #[error("No contract is configured for this service")]
    ContractMissing,

    #[error("Signature image is not valid: {0}")]
    InvalidSignature(String),

    #[error("The terms must be accepted")]
    TermsNotAccepted,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timed out waiting for check-in")]
    WaitTimedOut,

    #[error("Wait for check-in was cancelled")]
    WaitCancelled,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<AppointmentError> for CheckInError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => CheckInError::AppointmentNotFound,
            AppointmentError::ValidationError(msg) => CheckInError::Validation(msg),
            other => CheckInError::Database(other.to_string()),
        }
    }
}

impl From<ServiceCatalogError> for CheckInError {
    fn from(err: ServiceCatalogError) -> Self {
        CheckInError::Database(err.to_string())
    }
}

impl From<CheckInError> for AppError {
    fn from(err: CheckInError) -> Self {
        match err {
            CheckInError::TokenNotFound | CheckInError::AppointmentNotFound | CheckInError::ContractMissing => {
                AppError::NotFound(err.to_string())
            }
            CheckInError::TokenExpired | CheckInError::TokenAlreadyUsed => AppError::Gone(err.to_string()),
            CheckInError::NotCheckable(_) => AppError::Conflict(err.to_string()),
            CheckInError::InvalidSignature(_) | CheckInError::TermsNotAccepted => {
                AppError::ValidationError(err.to_string())
            }
            CheckInError::Validation(msg) => AppError::ValidationError(msg),
            CheckInError::WaitTimedOut => AppError::Timeout(err.to_string()),
            // Only produced once the caller has gone away
            CheckInError::WaitCancelled => AppError::Timeout(err.to_string()),
            CheckInError::Database(msg) => AppError::Database(msg),
        }
    }
}
