// libs/availability-cell/src/services/blocked_dates.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AvailabilityError, BlockedInterval, BlockedIntervalInput};
use crate::services::evaluator;

const TABLE: &str = "/rest/v1/blocked_dates";

pub struct BlockedDateService {
    supabase: Arc<SupabaseClient>,
}

impl BlockedDateService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Every blocked interval, oldest start first. Malformed rows are returned
    /// as stored and logged.
    pub async fn list(&self, auth_token: Option<&str>) -> Result<Vec<BlockedInterval>, AvailabilityError> {
        debug!("Fetching blocked dates");

        let path = format!("{}?select=*&order=start_date.asc,start_time.asc.nullsfirst", TABLE);
        let intervals: Vec<BlockedInterval> = self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| AvailabilityError::Database(e.to_string()))?;

        let malformed = evaluator::malformed_ids(&intervals);
        if !malformed.is_empty() {
            warn!("{} malformed blocked date rows in store: {:?}", malformed.len(), malformed);
        }

        Ok(intervals)
    }

    /// Intervals whose date range touches `from..=to`.
    pub async fn list_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<BlockedInterval>, AvailabilityError> {
        debug!("Fetching blocked dates between {} and {}", from, to);

        let path = format!(
            "{}?select=*&start_date=lte.{}&end_date=gte.{}&order=start_date.asc",
            TABLE,
            to.format("%Y-%m-%d"),
            from.format("%Y-%m-%d"),
        );

        self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| AvailabilityError::Database(e.to_string()))
    }

    pub async fn get(&self, id: Uuid, auth_token: Option<&str>) -> Result<BlockedInterval, AvailabilityError> {
        let path = format!("{}?id=eq.{}", TABLE, id);
        let mut rows: Vec<BlockedInterval> = self.supabase
            .select(&path, auth_token)
            .await
            .map_err(|e| AvailabilityError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(AvailabilityError::NotFound);
        }
        Ok(rows.remove(0))
    }

    pub async fn create(
        &self,
        input: BlockedIntervalInput,
        auth_token: &str,
    ) -> Result<BlockedInterval, AvailabilityError> {
        let input = input.validate()?;
        debug!("Creating blocked date {} to {} (all_day: {})", input.start_date, input.end_date, input.all_day);

        let mut row = input.to_row();
        row["created_at"] = json!(Utc::now().to_rfc3339());
        row["updated_at"] = json!(Utc::now().to_rfc3339());

        let interval: BlockedInterval = self.supabase
            .insert(TABLE, Some(auth_token), row)
            .await
            .map_err(|e| AvailabilityError::Database(e.to_string()))?;

        info!("Blocked date {} created ({} to {})", interval.id, interval.start_date, interval.end_date);
        Ok(interval)
    }

    /// Full replacement of an interval's fields. Last write wins.
    pub async fn update(
        &self,
        id: Uuid,
        input: BlockedIntervalInput,
        auth_token: &str,
    ) -> Result<BlockedInterval, AvailabilityError> {
        let input = input.validate()?;
        debug!("Updating blocked date {}", id);

        let mut changes = input.to_row();
        changes["updated_at"] = json!(Utc::now().to_rfc3339());

        let path = format!("{}?id=eq.{}", TABLE, id);
        let mut rows: Vec<BlockedInterval> = self.supabase
            .update(&path, Some(auth_token), changes)
            .await
            .map_err(|e| AvailabilityError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(AvailabilityError::NotFound);
        }

        info!("Blocked date {} updated", id);
        Ok(rows.remove(0))
    }

    pub async fn delete(&self, id: Uuid, auth_token: &str) -> Result<(), AvailabilityError> {
        debug!("Deleting blocked date {}", id);

        let path = format!("{}?id=eq.{}", TABLE, id);
        let rows: Vec<BlockedInterval> = self.supabase
            .delete(&path, Some(auth_token))
            .await
            .map_err(|e| AvailabilityError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(AvailabilityError::NotFound);
        }

        info!("Blocked date {} deleted", id);
        Ok(())
    }
}
