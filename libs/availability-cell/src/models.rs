// libs/availability-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::time_format;

// ==============================================================================
// BLOCKED INTERVALS
// ==============================================================================

/// A date (and optionally time-of-day) range during which bookings are refused.
/// Rows are taken as stored; [`BlockedInterval::defect`] reports rows that
/// contradict themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockedInterval {
    pub id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub all_day: bool,
    #[serde(with = "time_format::option", default)]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "time_format::option", default)]
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalDefect {
    InvertedDates,
    MissingTimes,
    InvertedTimes,
}

impl fmt::Display for IntervalDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalDefect::InvertedDates => write!(f, "end_date is before start_date"),
            IntervalDefect::MissingTimes => write!(f, "start_time and end_time are required unless all_day is set"),
            IntervalDefect::InvertedTimes => write!(f, "start_time must be before end_time"),
        }
    }
}

impl BlockedInterval {
    /// Day-granularity membership; times are ignored.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn defect(&self) -> Option<IntervalDefect> {
        interval_defect(self.start_date, self.end_date, self.all_day, self.start_time, self.end_time)
    }

    /// The blocked `[start_time, end_time)` sub-range of a well-formed partial-day interval.
    pub fn time_range(&self) -> Option<TimeRange> {
        if self.all_day {
            return None;
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if start < end => Some(TimeRange { start, end }),
            _ => None,
        }
    }
}

fn interval_defect(
    start_date: NaiveDate,
    end_date: NaiveDate,
    all_day: bool,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
) -> Option<IntervalDefect> {
    if end_date < start_date {
        return Some(IntervalDefect::InvertedDates);
    }
    if all_day {
        return None;
    }
    match (start_time, end_time) {
        (Some(start), Some(end)) if start < end => None,
        (Some(_), Some(_)) => Some(IntervalDefect::InvertedTimes),
        _ => Some(IntervalDefect::MissingTimes),
    }
}

/// Body of `POST /blocked-dates` and `PUT /blocked-dates/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedIntervalInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub all_day: bool,
    #[serde(with = "time_format::option", default)]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "time_format::option", default)]
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl BlockedIntervalInput {
    /// Rejects rows the evaluator would have to treat as malformed. Times sent
    /// alongside `all_day` are dropped.
    pub fn validate(mut self) -> Result<Self, AvailabilityError> {
        if let Some(defect) = interval_defect(
            self.start_date,
            self.end_date,
            self.all_day,
            self.start_time,
            self.end_time,
        ) {
            return Err(AvailabilityError::Validation(defect.to_string()));
        }

        if self.all_day {
            self.start_time = None;
            self.end_time = None;
        }

        self.reason = self.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self.notes = self.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        Ok(self)
    }

    pub fn to_row(&self) -> Value {
        json!({
            "start_date": self.start_date.format("%Y-%m-%d").to_string(),
            "end_date": self.end_date.format("%Y-%m-%d").to_string(),
            "all_day": self.all_day,
            "start_time": self.start_time.as_ref().map(time_format::format_time),
            "end_time": self.end_time.as_ref().map(time_format::format_time),
            "reason": self.reason,
            "notes": self.notes,
        })
    }
}

// ==============================================================================
// EVALUATION
// ==============================================================================

/// A proposed `(date, time?)` from the booking wizard or reservation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub date: NaiveDate,
    #[serde(with = "time_format::option", default)]
    pub time: Option<NaiveTime>,
}

impl CandidateSlot {
    pub fn day(date: NaiveDate) -> Self {
        Self { date, time: None }
    }

    pub fn at(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time: Some(time) }
    }
}

/// Half-open time-of-day range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "time_format")]
    pub start: NaiveTime,
    #[serde(with = "time_format")]
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnavailableReason {
    PastDate,
    BlockedAllDay { interval_id: Uuid },
    BlockedTimeRange { interval_id: Uuid, range: TimeRange },
    /// Only produced under the fail-closed policy.
    MalformedBlock { interval_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityDecision {
    pub available: bool,
    pub reason: Option<UnavailableReason>,
    /// Ids of self-contradictory intervals seen while evaluating. Callers log these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub malformed: Vec<Uuid>,
}

impl AvailabilityDecision {
    pub fn available(malformed: Vec<Uuid>) -> Self {
        Self { available: true, reason: None, malformed }
    }

    pub fn unavailable(reason: UnavailableReason, malformed: Vec<Uuid>) -> Self {
        Self { available: false, reason: Some(reason), malformed }
    }

    pub fn message(&self) -> &'static str {
        match self.reason {
            None => "This date/time is available",
            Some(UnavailableReason::PastDate) => "This date is in the past",
            Some(_) => "This date/time is not available",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Past,
    Blocked,
    Partial,
    Open,
}

/// Calendar cell state for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub status: DayStatus,
    /// Merged blocked ranges, only for `partial` days.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_ranges: Vec<TimeRange>,
}

// ==============================================================================
// QUERY PARAMETERS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityCheckQuery {
    pub date: NaiveDate,
    #[serde(with = "time_format::option", default)]
    pub time: Option<NaiveTime>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Blocked date not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::NotFound => AppError::NotFound("Blocked date not found".to_string()),
            AvailabilityError::Validation(msg) => AppError::ValidationError(msg),
            AvailabilityError::Database(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        time_format::parse_time(s).unwrap()
    }

    fn input(all_day: bool, start: Option<&str>, end: Option<&str>) -> BlockedIntervalInput {
        BlockedIntervalInput {
            start_date: date("2030-03-01"),
            end_date: date("2030-03-02"),
            all_day,
            start_time: start.map(time),
            end_time: end.map(time),
            reason: Some("  ".to_string()),
            notes: Some(" Laser maintenance ".to_string()),
        }
    }

    #[test]
    fn test_input_validation() {
        assert!(input(false, Some("10:00"), Some("12:00")).validate().is_ok());
        assert!(input(false, None, Some("12:00")).validate().is_err());
        assert!(input(false, Some("12:00"), Some("12:00")).validate().is_err());

        let mut inverted = input(true, None, None);
        inverted.end_date = date("2030-02-28");
        assert!(matches!(inverted.validate(), Err(AvailabilityError::Validation(_))));
    }

    #[test]
    fn test_all_day_input_drops_times_and_trims_text() {
        let validated = input(true, Some("10:00"), Some("12:00")).validate().unwrap();
        assert!(validated.start_time.is_none());
        assert!(validated.end_time.is_none());
        assert!(validated.reason.is_none());
        assert_eq!(validated.notes.as_deref(), Some("Laser maintenance"));

        let row = validated.to_row();
        assert_eq!(row["start_date"], "2030-03-01");
        assert!(row["start_time"].is_null());
    }

    #[test]
    fn test_stored_row_shape() {
        let row: BlockedInterval = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "start_date": "2030-03-01",
            "end_date": "2030-03-01",
            "all_day": false,
            "start_time": "10:00:00",
            "end_time": "12:00:00",
            "reason": null,
            "notes": null
        }))
        .unwrap();

        assert_eq!(row.time_range(), Some(TimeRange { start: time("10:00"), end: time("12:00") }));
        let out = serde_json::to_value(&row).unwrap();
        assert_eq!(out["start_time"], "10:00");
        assert!(out.get("created_at").is_none());
    }

    #[test]
    fn test_time_range_is_half_open() {
        let range = TimeRange { start: time("10:00"), end: time("12:00") };
        assert!(range.contains(time("10:00")));
        assert!(!range.contains(time("12:00")));
        assert!(range.overlaps(&TimeRange { start: time("11:30"), end: time("12:30") }));
        assert!(!range.overlaps(&TimeRange { start: time("12:00"), end: time("13:00") }));
    }
}
