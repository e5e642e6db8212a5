// libs/appointment-cell/src/services/patients.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde_json::json;
use tracing::{debug, info};

use shared_database::supabase::SupabaseClient;

use crate::models::{AppointmentError, Patient, PatientInfo};

const TABLE: &str = "/rest/v1/patients";

pub struct PatientDirectory {
    supabase: Arc<SupabaseClient>,
}

impl PatientDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn find_by_email(&self, email: &str, auth_token: Option<&str>) -> Result<Option<Patient>, AppointmentError> {
        let path = format!("{}?select=*&email=eq.{}", TABLE, urlencoding::encode(email));
        let rows: Vec<Patient> = self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;
        Ok(rows.into_iter().next())
    }

    /// Existing patient with this email, or a new one. Existing rows keep
    /// their stored details.
    pub async fn find_or_create(&self, info: &PatientInfo, auth_token: Option<&str>) -> Result<Patient, AppointmentError> {
        if let Some(patient) = self.find_by_email(&info.email, auth_token).await? {
            debug!("Reusing patient {} for {}", patient.id, info.email);
            return Ok(patient);
        }

        let row = json!({
            "first_name": info.first_name,
            "last_name": info.last_name,
            "email": info.email,
            "phone": info.phone,
            "created_at": Utc::now().to_rfc3339(),
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=ignore-duplicates,return=representation"),
        );

        let path = format!("{}?on_conflict=email", TABLE);
        let created: Vec<Patient> = self.supabase
            .request_with_headers(Method::POST, &path, auth_token, Some(row), Some(headers))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        match created.into_iter().next() {
            Some(patient) => {
                info!("Patient {} created", patient.id);
                Ok(patient)
            }
            // Another request inserted the same email first
            None => self
                .find_by_email(&info.email, auth_token)
                .await?
                .ok_or_else(|| AppointmentError::DatabaseError("Patient upsert returned no row".to_string())),
        }
    }
}
