// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use availability_cell::models::AvailabilityError;
use service_cell::ServiceCatalogError;
use shared_models::error::AppError;
use shared_models::time_format;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub service_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_date: NaiveDate,
    #[serde(with = "time_format")]
    pub scheduled_time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Statuses that hold their slot against other bookings.
    pub const OCCUPYING: [AppointmentStatus; 2] = [AppointmentStatus::Pending, AppointmentStatus::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    pub fn occupies_slot(&self) -> bool {
        Self::OCCUPYING.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no_show" => Ok(AppointmentStatus::NoShow),
            other => Err(AppointmentError::ValidationError(format!("Unknown status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Body of the public `POST /appointments`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReserveAppointmentRequest {
    pub service_id: Uuid,
    pub scheduled_date: NaiveDate,
    #[serde(with = "time_format")]
    pub scheduled_time: NaiveTime,
    pub patient_info: PatientInfo,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub scheduled_date: NaiveDate,
    #[serde(with = "time_format")]
    pub scheduled_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentSearchQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableTimesQuery {
    pub date: NaiveDate,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableTimesResponse {
    pub date: NaiveDate,
    pub times: Vec<String>,
}

// ==============================================================================
// VALIDATION
// ==============================================================================

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_NOTES_LENGTH: usize = 2000;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const PHONE_PATTERN: &str = r"^\+?[0-9][0-9 ().\-]{6,19}$";

fn is_match(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|regex| regex.is_match(value))
}

fn valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    email.len() <= 254 && is_match(&EMAIL, EMAIL_PATTERN, email)
}

fn valid_phone(phone: &str) -> bool {
    static PHONE: OnceLock<Option<Regex>> = OnceLock::new();
    is_match(&PHONE, PHONE_PATTERN, phone)
}

fn required_name(field: &str, value: &str) -> Result<String, AppointmentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppointmentError::ValidationError(format!("{} is required", field)));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(AppointmentError::ValidationError(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

impl PatientInfo {
    /// Trimmed copy with a lowercased email, or the first invalid field.
    pub fn validate(&self) -> Result<PatientInfo, AppointmentError> {
        let first_name = required_name("first_name", &self.first_name)?;
        let last_name = required_name("last_name", &self.last_name)?;

        let email = self.email.trim().to_lowercase();
        if !valid_email(&email) {
            return Err(AppointmentError::ValidationError("A valid email is required".to_string()));
        }

        let phone = self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
        if let Some(phone) = phone {
            if !valid_phone(phone) {
                return Err(AppointmentError::ValidationError("Phone number is not valid".to_string()));
            }
        }

        Ok(PatientInfo {
            first_name,
            last_name,
            email,
            phone: phone.map(str::to_string),
        })
    }
}

impl ReserveAppointmentRequest {
    pub fn validate(mut self) -> Result<Self, AppointmentError> {
        self.patient_info = self.patient_info.validate()?;

        self.notes = self.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LENGTH {
                return Err(AppointmentError::ValidationError(format!(
                    "notes must be at most {} characters",
                    MAX_NOTES_LENGTH
                )));
            }
        }

        Ok(self)
    }
}

impl AppointmentSearchQuery {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if to < from {
                return Err(AppointmentError::ValidationError("'to' must not be before 'from'".to_string()));
            }
        }
        Ok(())
    }

    pub fn page_size(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Service is not currently offered")]
    ServiceInactive,

    /// The evaluator refused the slot (past date or blocked).
    #[error("{0}")]
    SlotUnavailable(String),

    /// Another active appointment already holds the slot.
    #[error("This time slot has already been booked")]
    SlotTaken,

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Appointment is {0} and can no longer be changed")]
    Finalized(AppointmentStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AvailabilityError> for AppointmentError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::Validation(msg) => AppointmentError::ValidationError(msg),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ServiceCatalogError> for AppointmentError {
    fn from(err: ServiceCatalogError) -> Self {
        match err {
            ServiceCatalogError::NotFound => AppointmentError::ServiceNotFound,
            ServiceCatalogError::Inactive => AppointmentError::ServiceInactive,
            ServiceCatalogError::Validation(msg) => AppointmentError::ValidationError(msg),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::ServiceNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::ServiceInactive => AppError::BadRequest(err.to_string()),
            AppointmentError::SlotUnavailable(msg) => AppError::SlotUnavailable(msg),
            AppointmentError::SlotTaken => AppError::SlotTaken(err.to_string()),
            AppointmentError::InvalidStatusTransition { .. } | AppointmentError::Finalized(_) => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
