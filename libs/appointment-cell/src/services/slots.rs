// libs/appointment-cell/src/services/slots.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Timelike};
use tracing::{debug, warn};
use uuid::Uuid;

use availability_cell::models::{BlockedInterval, CandidateSlot};
use availability_cell::services::{evaluator, BlockedDateService};
use service_cell::ServiceCatalogService;
use shared_config::{AppConfig, MalformedIntervalPolicy};
use shared_database::supabase::SupabaseClient;
use shared_models::time_format;

use crate::models::{AppointmentError, AvailableTimesResponse};
use crate::services::conflict::ConflictDetectionService;

/// Business-hours grid for one day.
#[derive(Debug, Clone, Copy)]
pub struct SlotGrid {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub step_minutes: u32,
}

impl SlotGrid {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            open: config.clinic_open_time,
            close: config.clinic_close_time,
            step_minutes: config.slot_interval_minutes,
        }
    }

    /// Start times from opening up to closing. With a duration, the visit
    /// must also end by closing time.
    pub fn start_times(&self, duration_minutes: Option<i64>) -> Vec<NaiveTime> {
        let step = i64::from(self.step_minutes.max(1));
        let open = minutes_of_day(self.open);
        let close = minutes_of_day(self.close);
        let latest_start = match duration_minutes {
            Some(duration) => close - duration.max(0),
            None => close - 1,
        };

        (0..)
            .map(|i| open + i * step)
            .take_while(|minute| *minute <= latest_start && *minute < close)
            .filter_map(|minute| NaiveTime::from_hms_opt((minute / 60) as u32, (minute % 60) as u32, 0))
            .collect()
    }
}

fn minutes_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Grid times on `date` the evaluator accepts and nobody holds.
pub fn open_times(
    grid: &SlotGrid,
    date: NaiveDate,
    today: NaiveDate,
    duration_minutes: Option<i64>,
    intervals: &[BlockedInterval],
    occupied: &HashSet<NaiveTime>,
    policy: MalformedIntervalPolicy,
) -> Vec<NaiveTime> {
    grid.start_times(duration_minutes)
        .into_iter()
        .filter(|time| {
            evaluator::evaluate(&CandidateSlot::at(date, *time), today, intervals, policy).available
        })
        .filter(|time| match duration_minutes {
            Some(duration) => evaluator::span_conflict(date, *time, duration, intervals, policy).is_none(),
            None => true,
        })
        .filter(|time| !occupied.contains(time))
        .collect()
}

pub struct SlotService {
    blocked_dates: BlockedDateService,
    catalog: ServiceCatalogService,
    conflicts: ConflictDetectionService,
    grid: SlotGrid,
    config: AppConfig,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            blocked_dates: BlockedDateService::with_client(Arc::clone(&supabase)),
            catalog: ServiceCatalogService::with_client(Arc::clone(&supabase)),
            conflicts: ConflictDetectionService::new(supabase),
            grid: SlotGrid::from_config(config),
            config: config.clone(),
        }
    }

    pub async fn available_times(
        &self,
        date: NaiveDate,
        service_id: Option<Uuid>,
    ) -> Result<AvailableTimesResponse, AppointmentError> {
        debug!("Computing available times for {} (service {:?})", date, service_id);

        let duration = match service_id {
            Some(id) => Some(i64::from(self.catalog.get_bookable(id, None).await?.duration_minutes)),
            None => None,
        };

        let intervals = self.blocked_dates.list(None).await?;
        let malformed = evaluator::malformed_ids(&intervals);
        if !malformed.is_empty() {
            warn!("Available times for {} computed with malformed blocked dates {:?}", date, malformed);
        }

        let occupied: HashSet<NaiveTime> = self.conflicts.occupied_times(date, None).await?.into_iter().collect();

        let times = open_times(
            &self.grid,
            date,
            self.config.clinic_today(),
            duration,
            &intervals,
            &occupied,
            self.config.malformed_interval_policy,
        );

        Ok(AvailableTimesResponse {
            date,
            times: times.iter().map(time_format::format_time).collect(),
        })
    }
}
