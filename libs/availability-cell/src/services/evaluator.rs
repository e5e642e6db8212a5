// libs/availability-cell/src/services/evaluator.rs
//! Bookability of a date or date+time against the blocked-interval set.
//!
//! Everything here is a pure function of its inputs. Dates are compared as
//! calendar dates, never as instants, so a slot near midnight cannot drift onto
//! a neighbouring day. Intervals are a union: every interval covering the
//! candidate date is considered, and one all-day match blocks the whole day.

use chrono::{Duration, NaiveDate, NaiveTime};
use uuid::Uuid;

use shared_config::MalformedIntervalPolicy;

use crate::models::{
    AvailabilityDecision, BlockedInterval, CandidateSlot, DayAvailability, DayStatus,
    IntervalDefect, TimeRange, UnavailableReason,
};

/// `true` when the candidate may be booked. Malformed intervals block nothing.
pub fn is_available(candidate: &CandidateSlot, today: NaiveDate, intervals: &[BlockedInterval]) -> bool {
    evaluate(candidate, today, intervals, MalformedIntervalPolicy::FailOpen).available
}

pub fn evaluate(
    candidate: &CandidateSlot,
    today: NaiveDate,
    intervals: &[BlockedInterval],
    policy: MalformedIntervalPolicy,
) -> AvailabilityDecision {
    if candidate.date < today {
        return AvailabilityDecision::unavailable(UnavailableReason::PastDate, Vec::new());
    }

    let mut malformed = Vec::new();
    let mut whole_day: Option<UnavailableReason> = None;
    let mut time_block: Option<UnavailableReason> = None;

    for interval in intervals {
        match classify(interval, candidate.date, policy) {
            Coverage::Malformed { blocks_day } => {
                malformed.push(interval.id);
                if blocks_day && whole_day.is_none() {
                    whole_day = Some(UnavailableReason::MalformedBlock { interval_id: interval.id });
                }
            }
            Coverage::None => {}
            Coverage::AllDay => {
                // An explicit all-day block outranks a fail-closed malformed one.
                if !matches!(whole_day, Some(UnavailableReason::BlockedAllDay { .. })) {
                    whole_day = Some(UnavailableReason::BlockedAllDay { interval_id: interval.id });
                }
            }
            Coverage::Partial(range) => {
                if let Some(time) = candidate.time {
                    if time_block.is_none() && range.contains(time) {
                        time_block = Some(UnavailableReason::BlockedTimeRange {
                            interval_id: interval.id,
                            range,
                        });
                    }
                }
            }
        }
    }

    match whole_day.or(time_block) {
        Some(reason) => AvailabilityDecision::unavailable(reason, malformed),
        None => AvailabilityDecision::available(malformed),
    }
}

/// Calendar state for one date: past, fully blocked, partially blocked (with
/// the merged blocked ranges), or open.
pub fn day_availability(
    date: NaiveDate,
    today: NaiveDate,
    intervals: &[BlockedInterval],
    policy: MalformedIntervalPolicy,
) -> DayAvailability {
    if date < today {
        return DayAvailability { date, status: DayStatus::Past, blocked_ranges: Vec::new() };
    }

    let mut ranges = Vec::new();
    for interval in intervals {
        match classify(interval, date, policy) {
            Coverage::AllDay | Coverage::Malformed { blocks_day: true } => {
                return DayAvailability { date, status: DayStatus::Blocked, blocked_ranges: Vec::new() };
            }
            Coverage::Partial(range) => ranges.push(range),
            Coverage::Malformed { blocks_day: false } | Coverage::None => {}
        }
    }

    if ranges.is_empty() {
        DayAvailability { date, status: DayStatus::Open, blocked_ranges: Vec::new() }
    } else {
        DayAvailability { date, status: DayStatus::Partial, blocked_ranges: merge_ranges(ranges) }
    }
}

/// [`day_availability`] for every date in `from..=to`.
pub fn calendar(
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
    intervals: &[BlockedInterval],
    policy: MalformedIntervalPolicy,
) -> Vec<DayAvailability> {
    from.iter_days()
        .take_while(|date| *date <= to)
        .map(|date| day_availability(date, today, intervals, policy))
        .collect()
}

/// The first blocked range on `date` that a visit starting at `start` and
/// lasting `duration_minutes` would run into. Visits that would run past
/// midnight are clipped to the end of the day.
pub fn span_conflict(
    date: NaiveDate,
    start: NaiveTime,
    duration_minutes: i64,
    intervals: &[BlockedInterval],
    policy: MalformedIntervalPolicy,
) -> Option<TimeRange> {
    let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(duration_minutes.max(0)));
    let end = if wrapped != 0 { NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(end) } else { end };
    let visit = TimeRange { start, end };

    intervals
        .iter()
        .filter_map(|interval| match classify(interval, date, policy) {
            Coverage::Partial(range) => Some(range),
            _ => None,
        })
        .find(|range| range.overlaps(&visit))
}

/// Union of half-open ranges; overlapping and touching ranges are joined.
pub fn merge_ranges(mut ranges: Vec<TimeRange>) -> Vec<TimeRange> {
    ranges.sort_by_key(|r| (r.start, r.end));

    let mut merged: Vec<TimeRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                if range.end > last.end {
                    last.end = range.end;
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Ids of every self-contradictory interval in the set.
pub fn malformed_ids(intervals: &[BlockedInterval]) -> Vec<Uuid> {
    intervals.iter().filter(|i| i.defect().is_some()).map(|i| i.id).collect()
}

enum Coverage {
    None,
    AllDay,
    Partial(TimeRange),
    Malformed { blocks_day: bool },
}

fn classify(interval: &BlockedInterval, date: NaiveDate, policy: MalformedIntervalPolicy) -> Coverage {
    match interval.defect() {
        Some(defect) => {
            // Inverted dates give no usable range, so even fail-closed cannot
            // say which days they were meant to block.
            let blocks_day = policy == MalformedIntervalPolicy::FailClosed
                && defect != IntervalDefect::InvertedDates
                && interval.covers(date);
            Coverage::Malformed { blocks_day }
        }
        None if !interval.covers(date) => Coverage::None,
        None if interval.all_day => Coverage::AllDay,
        None => interval.time_range().map(Coverage::Partial).unwrap_or(Coverage::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::time_format::parse_time;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        parse_time(s).unwrap()
    }

    fn all_day(start: &str, end: &str) -> BlockedInterval {
        BlockedInterval {
            id: Uuid::new_v4(),
            start_date: d(start),
            end_date: d(end),
            all_day: true,
            start_time: None,
            end_time: None,
            reason: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn partial(date: &str, start: &str, end: &str) -> BlockedInterval {
        BlockedInterval {
            all_day: false,
            start_time: Some(t(start)),
            end_time: Some(t(end)),
            ..all_day(date, date)
        }
    }

    const TODAY: &str = "2030-06-10";

    #[test]
    fn test_past_dates_never_available() {
        let today = d(TODAY);
        let yesterday = d("2030-06-09");

        assert!(!is_available(&CandidateSlot::day(yesterday), today, &[]));
        assert!(!is_available(&CandidateSlot::at(yesterday, t("10:00")), today, &[partial("2030-06-01", "01:00", "02:00")]));

        let decision = evaluate(&CandidateSlot::day(yesterday), today, &[], MalformedIntervalPolicy::FailOpen);
        assert_eq!(decision.reason, Some(UnavailableReason::PastDate));
    }

    #[test]
    fn test_today_is_bookable() {
        assert!(is_available(&CandidateSlot::day(d(TODAY)), d(TODAY), &[]));
    }

    #[test]
    fn test_all_day_block_dominates_every_time() {
        let block = all_day("2030-06-12", "2030-06-14");
        let today = d(TODAY);

        for date in ["2030-06-12", "2030-06-13", "2030-06-14"] {
            assert!(!is_available(&CandidateSlot::day(d(date)), today, &[block.clone()]));
            for time in ["00:00", "09:30", "23:59"] {
                assert!(!is_available(&CandidateSlot::at(d(date), t(time)), today, &[block.clone()]));
            }
        }
        assert!(is_available(&CandidateSlot::day(d("2030-06-11")), today, &[block.clone()]));
        assert!(is_available(&CandidateSlot::day(d("2030-06-15")), today, &[block]));
    }

    #[test]
    fn test_partial_block_is_end_exclusive() {
        let block = partial("2030-06-12", "10:00", "12:00");
        let date = d("2030-06-12");
        let today = d(TODAY);
        let check = |time: &str| is_available(&CandidateSlot::at(date, t(time)), today, &[block.clone()]);

        assert!(check("09:59"));
        assert!(!check("10:00"));
        assert!(!check("11:59"));
        assert!(check("12:00"));

        // The day itself stays bookable.
        assert!(is_available(&CandidateSlot::day(date), today, &[block.clone()]));
    }

    #[test]
    fn test_overlapping_partials_union() {
        let intervals = [partial("2030-06-12", "10:00", "12:00"), partial("2030-06-12", "11:00", "14:00")];
        let date = d("2030-06-12");
        let today = d(TODAY);

        assert!(!is_available(&CandidateSlot::at(date, t("10:30")), today, &intervals));
        assert!(!is_available(&CandidateSlot::at(date, t("13:30")), today, &intervals));
        assert!(is_available(&CandidateSlot::at(date, t("14:00")), today, &intervals));
    }

    #[test]
    fn test_all_day_match_found_behind_partial() {
        let date = "2030-06-12";
        let intervals = [partial(date, "10:00", "11:00"), all_day("2030-06-01", "2030-06-30")];
        let decision = evaluate(&CandidateSlot::at(d(date), t("15:00")), d(TODAY), &intervals, MalformedIntervalPolicy::FailOpen);

        assert!(!decision.available);
        assert_eq!(decision.reason, Some(UnavailableReason::BlockedAllDay { interval_id: intervals[1].id }));
    }

    #[test]
    fn test_no_matching_interval_is_available() {
        let intervals = [all_day("2030-07-01", "2030-07-02"), partial("2030-06-20", "10:00", "12:00")];
        let date = d("2030-06-12");
        for time in ["00:00", "10:30", "23:59"] {
            assert!(is_available(&CandidateSlot::at(date, t(time)), d(TODAY), &intervals));
        }
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let intervals = [partial("2030-06-12", "10:00", "12:00")];
        let candidate = CandidateSlot::at(d("2030-06-12"), t("10:15"));
        let first = evaluate(&candidate, d(TODAY), &intervals, MalformedIntervalPolicy::FailOpen);
        let second = evaluate(&candidate, d(TODAY), &intervals, MalformedIntervalPolicy::FailOpen);
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_intervals_fail_open_and_are_reported() {
        let inverted = all_day("2030-06-14", "2030-06-12");
        let mut missing_times = partial("2030-06-12", "10:00", "12:00");
        missing_times.end_time = None;
        let inverted_times = partial("2030-06-12", "12:00", "10:00");
        let intervals = [inverted.clone(), missing_times.clone(), inverted_times.clone()];

        let decision = evaluate(&CandidateSlot::at(d("2030-06-13"), t("11:00")), d(TODAY), &intervals, MalformedIntervalPolicy::FailOpen);
        assert!(decision.available);
        assert_eq!(decision.malformed, vec![inverted.id, missing_times.id, inverted_times.id]);

        assert!(is_available(&CandidateSlot::at(d("2030-06-12"), t("11:00")), d(TODAY), &intervals));
        assert_eq!(malformed_ids(&intervals).len(), 3);
    }

    #[test]
    fn test_fail_closed_blocks_dates_a_malformed_row_covers() {
        let mut missing_times = partial("2030-06-12", "10:00", "12:00");
        missing_times.start_time = None;
        let inverted = all_day("2030-06-14", "2030-06-12");
        let intervals = [missing_times.clone(), inverted];
        let policy = MalformedIntervalPolicy::FailClosed;

        let decision = evaluate(&CandidateSlot::at(d("2030-06-12"), t("17:00")), d(TODAY), &intervals, policy);
        assert_eq!(decision.reason, Some(UnavailableReason::MalformedBlock { interval_id: missing_times.id }));

        // Inverted dates cover nothing even when failing closed.
        assert!(evaluate(&CandidateSlot::day(d("2030-06-13")), d(TODAY), &intervals, policy).available);
        assert_eq!(day_availability(d("2030-06-12"), d(TODAY), &intervals, policy).status, DayStatus::Blocked);
    }

    #[test]
    fn test_day_availability_states() {
        let intervals = [
            all_day("2030-06-15", "2030-06-15"),
            partial("2030-06-12", "10:00", "11:00"),
            partial("2030-06-12", "11:00", "12:30"),
            partial("2030-06-12", "15:00", "16:00"),
        ];
        let today = d(TODAY);
        let policy = MalformedIntervalPolicy::FailOpen;

        assert_eq!(day_availability(d("2030-06-01"), today, &intervals, policy).status, DayStatus::Past);
        assert_eq!(day_availability(d("2030-06-15"), today, &intervals, policy).status, DayStatus::Blocked);
        assert_eq!(day_availability(d("2030-06-13"), today, &intervals, policy).status, DayStatus::Open);

        let partial_day = day_availability(d("2030-06-12"), today, &intervals, policy);
        assert_eq!(partial_day.status, DayStatus::Partial);
        assert_eq!(
            partial_day.blocked_ranges,
            vec![
                TimeRange { start: t("10:00"), end: t("12:30") },
                TimeRange { start: t("15:00"), end: t("16:00") },
            ]
        );
    }

    #[test]
    fn test_calendar_covers_inclusive_range() {
        let days = calendar(d("2030-06-09"), d("2030-06-12"), d(TODAY), &[all_day("2030-06-11", "2030-06-11")], MalformedIntervalPolicy::FailOpen);
        let statuses: Vec<DayStatus> = days.iter().map(|day| day.status).collect();
        assert_eq!(statuses, vec![DayStatus::Past, DayStatus::Open, DayStatus::Blocked, DayStatus::Open]);
    }

    #[test]
    fn test_span_conflict_detects_visits_running_into_a_block() {
        let intervals = [partial("2030-06-12", "12:00", "13:00")];
        let date = d("2030-06-12");
        let policy = MalformedIntervalPolicy::FailOpen;

        assert!(span_conflict(date, t("11:00"), 60, &intervals, policy).is_none());
        assert_eq!(
            span_conflict(date, t("11:30"), 60, &intervals, policy),
            Some(TimeRange { start: t("12:00"), end: t("13:00") })
        );
        assert!(span_conflict(date, t("13:00"), 90, &intervals, policy).is_none());
        assert!(span_conflict(d("2030-06-13"), t("11:30"), 60, &intervals, policy).is_none());
    }

    #[test]
    fn test_span_past_midnight_is_clipped() {
        let intervals = [partial("2030-06-12", "23:30", "23:45")];
        assert!(span_conflict(d("2030-06-12"), t("23:00"), 120, &intervals, MalformedIntervalPolicy::FailOpen).is_some());
    }

    #[test]
    fn test_merge_ranges_joins_touching() {
        let merged = merge_ranges(vec![
            TimeRange { start: t("13:00"), end: t("14:00") },
            TimeRange { start: t("09:00"), end: t("10:00") },
            TimeRange { start: t("10:00"), end: t("11:00") },
            TimeRange { start: t("09:30"), end: t("09:45") },
        ]);
        assert_eq!(
            merged,
            vec![
                TimeRange { start: t("09:00"), end: t("11:00") },
                TimeRange { start: t("13:00"), end: t("14:00") },
            ]
        );
    }
}
